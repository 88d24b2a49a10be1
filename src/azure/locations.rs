//! Subscription region enumeration
//!
//! Regions are read page by page; any failed page fails the whole listing so
//! a replication plan is never built from a partial region set.

use super::arm::{ArmClient, ArmSettings};
use super::credentials::CredentialResolver;
use super::error::AzureError;
use super::paths;
use crate::pipeline::resource::TargetRegion;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationPage {
    pub names: Vec<String>,
    pub next: Option<String>,
}

/// Paged source of subscription locations
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Fetches the first page when `continuation` is `None`
    async fn page(&self, continuation: Option<&str>) -> Result<LocationPage, AzureError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationListResult {
    #[serde(default)]
    value: Vec<LocationEntry>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationEntry {
    name: Option<String>,
}

#[async_trait]
impl LocationSource for ArmClient {
    async fn page(&self, continuation: Option<&str>) -> Result<LocationPage, AzureError> {
        let body = match continuation {
            Some(next) => self.get_url(next).await?,
            None => {
                self.get(
                    &paths::locations(self.subscription_id()),
                    paths::SUBSCRIPTIONS_API_VERSION,
                )
                .await?
            }
        };

        let parsed: LocationListResult = serde_json::from_value(body)
            .map_err(|e| AzureError::InvalidResponse(format!("location list: {}", e)))?;

        let names = parsed
            .value
            .into_iter()
            .map(|entry| {
                entry
                    .name
                    .ok_or_else(|| AzureError::InvalidResponse("location without a name".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LocationPage {
            names,
            next: parsed.next_link.filter(|link| !link.is_empty()),
        })
    }
}

/// Every location name, in page order
pub async fn list_locations(source: &dyn LocationSource) -> Result<Vec<String>, AzureError> {
    let mut names = Vec::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.page(continuation.as_deref()).await?;
        pages += 1;
        names.extend(page.names);
        match page.next {
            Some(next) => continuation = Some(next),
            None => break,
        }
    }

    debug!(pages, locations = names.len(), "Listed locations");
    Ok(names)
}

/// One single-replica target per region, included in `latest`
pub fn to_target_regions(names: impl IntoIterator<Item = String>) -> Vec<TargetRegion> {
    names.into_iter().map(TargetRegion::single_replica).collect()
}

/// Produces the replication targets for an image version
#[async_trait]
pub trait RegionLookup: Send + Sync {
    async fn target_regions(&self) -> Result<Vec<TargetRegion>, AzureError>;
}

/// Region lookup over any paged location source
pub struct SourceRegionLookup {
    source: Arc<dyn LocationSource>,
}

impl SourceRegionLookup {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl RegionLookup for SourceRegionLookup {
    async fn target_regions(&self) -> Result<Vec<TargetRegion>, AzureError> {
        Ok(to_target_regions(list_locations(self.source.as_ref()).await?))
    }
}

/// Lists the subscription's locations with freshly resolved credentials
pub struct ArmRegionLookup {
    settings: ArmSettings,
    credentials: Arc<dyn CredentialResolver>,
}

impl ArmRegionLookup {
    pub fn new(settings: ArmSettings, credentials: Arc<dyn CredentialResolver>) -> Self {
        Self {
            settings,
            credentials,
        }
    }
}

#[async_trait]
impl RegionLookup for ArmRegionLookup {
    async fn target_regions(&self) -> Result<Vec<TargetRegion>, AzureError> {
        let resolved = self.credentials.resolve().await?;
        let client = ArmClient::new(self.settings.clone(), resolved)?;
        let regions = to_target_regions(list_locations(&client).await?);
        info!(regions = regions.len(), "Resolved replication targets");
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::mock::MockLocationSource;

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let source = MockLocationSource::new(vec![
            Some(vec!["eastus", "westus"]),
            Some(vec!["westeurope"]),
        ]);

        let names = list_locations(&source).await.unwrap();
        assert_eq!(names, vec!["eastus", "westus", "westeurope"]);
        assert_eq!(source.requests(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_fails_listing() {
        let source = MockLocationSource::new(vec![Some(vec!["eastus"]), None]);
        assert!(list_locations(&source).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_subscription_yields_no_targets() {
        let lookup = SourceRegionLookup::new(Arc::new(MockLocationSource::new(vec![Some(vec![])])));
        assert!(lookup.target_regions().await.unwrap().is_empty());
    }

    #[test]
    fn test_target_regions_have_one_replica() {
        let regions = to_target_regions(vec!["eastus".to_string()]);
        assert_eq!(regions, vec![TargetRegion::single_replica("eastus")]);
        assert_eq!(regions[0].regional_replica_count, 1);
        assert!(!regions[0].exclude_from_latest);
    }
}
