//! Gallery sharing with an Azure AD tenant

use super::arm::{ArmClient, ArmSettings};
use super::credentials::CredentialResolver;
use super::error::AzureError;
use super::paths;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait GallerySharing: Send + Sync {
    /// Grants `tenant_id` read access to the gallery
    async fn share(&self, tenant_id: &str, resource_group: &str, gallery: &str) -> Result<(), AzureError>;
}

/// Gallery update granting group access to one AAD tenant
pub fn sharing_update_body(tenant_id: &str) -> Value {
    json!({
        "properties": {
            "sharingProfile": {
                "permissions": "Groups",
                "groups": [
                    { "type": "AADTenants", "ids": [tenant_id] }
                ]
            }
        }
    })
}

/// Patches the gallery's sharing profile with fresh credentials
pub struct ArmGallerySharing {
    settings: ArmSettings,
    credentials: Arc<dyn CredentialResolver>,
}

impl ArmGallerySharing {
    pub fn new(settings: ArmSettings, credentials: Arc<dyn CredentialResolver>) -> Self {
        Self {
            settings,
            credentials,
        }
    }
}

#[async_trait]
impl GallerySharing for ArmGallerySharing {
    async fn share(&self, tenant_id: &str, resource_group: &str, gallery: &str) -> Result<(), AzureError> {
        let resolved = self.credentials.resolve().await?;
        let client = ArmClient::new(self.settings.clone(), resolved)?;

        let path = paths::gallery(client.subscription_id(), resource_group, gallery);
        client
            .patch(&path, paths::COMPUTE_GALLERY_API_VERSION, &sharing_update_body(tenant_id))
            .await?;

        info!(gallery, resource_group, "Gallery shared with tenant");
        Ok(())
    }
}
