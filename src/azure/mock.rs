use super::error::AzureError;
use super::locations::{LocationPage, LocationSource};
use super::sharing::GallerySharing;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Location source serving scripted pages
///
/// `None` in place of a page makes that request fail.
pub struct MockLocationSource {
    pages: Vec<Option<Vec<String>>>,
    requests: AtomicUsize,
}

impl MockLocationSource {
    pub fn new(pages: Vec<Option<Vec<&str>>>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|page| page.map(|names| names.into_iter().map(str::to_string).collect()))
                .collect(),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for MockLocationSource {
    async fn page(&self, continuation: Option<&str>) -> Result<LocationPage, AzureError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let index = match continuation {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| AzureError::InvalidResponse(format!("bad continuation {}", token)))?,
        };

        match self.pages.get(index) {
            Some(Some(names)) => Ok(LocationPage {
                names: names.clone(),
                next: (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1)),
            }),
            Some(None) => Err(AzureError::Api {
                status: 500,
                code: "InternalServerError".to_string(),
                message: format!("page {} unavailable", index),
            }),
            None => Err(AzureError::InvalidResponse(format!("no page {}", index))),
        }
    }
}

/// Sharing applier that records each call
#[derive(Default)]
pub struct RecordingSharing {
    calls: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingSharing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// `(tenant, resource group, gallery)` per call
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GallerySharing for RecordingSharing {
    async fn share(&self, tenant_id: &str, resource_group: &str, gallery: &str) -> Result<(), AzureError> {
        self.calls.lock().unwrap().push((
            tenant_id.to_string(),
            resource_group.to_string(),
            gallery.to_string(),
        ));
        if self.fail {
            return Err(AzureError::OperationFailed {
                status: "Failed".to_string(),
                message: "sharing rejected".to_string(),
            });
        }
        Ok(())
    }
}
