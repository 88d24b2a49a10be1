use super::input::PropertyMap;
use super::provider::{ProviderError, ResourceProvider};
use super::resource::{ResourceArgs, ResourceId, ResourceKind};
use crate::azure::paths;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

const MOCK_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// In-memory provider that records every creation
///
/// Outputs mirror what Azure reports (`name`, `id`, `location`, SAS token),
/// with ids built for a fixed mock subscription.
pub struct MockProvider {
    created: Mutex<Vec<(ResourceId, ResourceArgs<String>)>>,
    failures: HashSet<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            failures: HashSet::new(),
        }
    }

    /// Makes creation of the resource with this logical id fail
    pub fn fail_on(mut self, id: impl Into<String>) -> Self {
        self.failures.insert(id.into());
        self
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub fn created_args(&self, id: &str) -> Option<ResourceArgs<String>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|(rid, _)| rid.as_str() == id)
            .map(|(_, args)| args.clone())
    }

    pub fn created_of_kind(&self, kind: ResourceKind) -> Vec<ResourceArgs<String>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, args)| args.kind() == kind)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn outputs_for(args: &ResourceArgs<String>) -> PropertyMap {
        let sub = MOCK_SUBSCRIPTION;
        let mut outputs = PropertyMap::new();
        let mut put = |key: &str, value: String| {
            outputs.insert(key.to_string(), value);
        };

        match args {
            ResourceArgs::ResourceGroup(a) => {
                put("name", a.name.clone());
                put("id", paths::resource_group(sub, &a.name));
                put("location", a.location.clone());
            }
            ResourceArgs::StorageAccount(a) => {
                put("name", a.name.clone());
                put("id", paths::storage_account(sub, &a.resource_group_name, &a.name));
                put("location", a.location.clone());
            }
            ResourceArgs::BlobContainer(a) => {
                put("name", a.name.clone());
                put(
                    "id",
                    paths::blob_container(sub, &a.resource_group_name, &a.account_name, &a.name),
                );
            }
            ResourceArgs::AccountSas(a) => {
                put(
                    "accountSasToken",
                    format!(
                        "sv=2022-11-02&ss={}&srt={}&sp={}&se={}&spr={}&sig=mock",
                        a.services, a.resource_types, a.permissions, a.expiry, a.protocol
                    ),
                );
            }
            ResourceArgs::Gallery(a) => {
                put("name", a.name.clone());
                put("id", paths::gallery(sub, &a.resource_group_name, &a.name));
                put("location", a.location.clone());
            }
            ResourceArgs::GalleryImage(a) => {
                put("name", a.name.clone());
                put(
                    "id",
                    paths::gallery_image(sub, &a.resource_group_name, &a.gallery_name, &a.name),
                );
                put("location", a.location.clone());
            }
            ResourceArgs::GalleryImageVersion(a) => {
                put("name", a.name.clone());
                put(
                    "id",
                    paths::gallery_image_version(
                        sub,
                        &a.resource_group_name,
                        &a.gallery_name,
                        &a.image_name,
                        &a.name,
                    ),
                );
                put("location", a.location.clone());
            }
            ResourceArgs::Command(_) => {
                put("stdout", String::new());
            }
        }

        outputs
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for MockProvider {
    async fn create(
        &self,
        id: &ResourceId,
        args: &ResourceArgs<String>,
    ) -> Result<PropertyMap, ProviderError> {
        if self.failures.contains(id.as_str()) {
            return Err(format!("MockProvider: configured failure for {}", id).into());
        }

        let outputs = Self::outputs_for(args);
        self.created
            .lock()
            .unwrap()
            .push((id.clone(), args.clone()));
        Ok(outputs)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
