//! Resource provider backed by ARM
//!
//! Each resource kind maps to one ARM call. Managed resources are created
//! with `PUT` and report `name`, `id` and `location` from the service
//! response; the account SAS is a `POST` action reporting `accountSasToken`.
//! `Command` resources run locally through a [`CommandRunner`].

use super::arm::ArmClient;
use super::error::AzureError;
use super::paths;
use crate::pipeline::command::{redact_secrets, CommandRunner};
use crate::pipeline::input::PropertyMap;
use crate::pipeline::provider::{ProviderError, ResourceProvider};
use crate::pipeline::resource::{
    AccountSasArgs, GalleryArgs, GalleryImageArgs, GalleryImageVersionArgs, ResourceArgs,
    ResourceGroupArgs, ResourceId, StorageAccountArgs,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct ArmProvider {
    client: ArmClient,
    commands: Arc<dyn CommandRunner>,
}

impl ArmProvider {
    pub fn new(client: ArmClient, commands: Arc<dyn CommandRunner>) -> Self {
        Self { client, commands }
    }

    async fn put(
        &self,
        path: String,
        api_version: &str,
        body: Value,
        fallback_name: &str,
        fallback_location: Option<&str>,
    ) -> Result<PropertyMap, AzureError> {
        let response = self.client.put(&path, api_version, &body).await?;

        let mut outputs = PropertyMap::new();
        let field = |key: &str| response.get(key).and_then(Value::as_str).map(str::to_string);

        outputs.insert("name".to_string(), field("name").unwrap_or_else(|| fallback_name.to_string()));
        outputs.insert("id".to_string(), field("id").unwrap_or(path));
        if let Some(location) = field("location").or_else(|| fallback_location.map(str::to_string)) {
            outputs.insert("location".to_string(), location);
        }
        Ok(outputs)
    }

    async fn list_account_sas(&self, args: &AccountSasArgs<String>) -> Result<PropertyMap, AzureError> {
        let path = paths::account_sas(
            self.client.subscription_id(),
            &args.resource_group_name,
            &args.account_name,
        );
        let response = self
            .client
            .post(&path, paths::STORAGE_API_VERSION, &account_sas_body(args))
            .await?;

        let token = response
            .get("accountSasToken")
            .and_then(Value::as_str)
            .ok_or_else(|| AzureError::InvalidResponse("accountSasToken missing".to_string()))?;

        let mut outputs = PropertyMap::new();
        outputs.insert("accountSasToken".to_string(), token.to_string());
        Ok(outputs)
    }
}

#[async_trait]
impl ResourceProvider for ArmProvider {
    async fn create(
        &self,
        id: &ResourceId,
        args: &ResourceArgs<String>,
    ) -> Result<PropertyMap, ProviderError> {
        let sub = self.client.subscription_id().to_string();
        info!(resource = %id, kind = %args.kind(), "Creating resource");

        let outputs = match args {
            ResourceArgs::ResourceGroup(a) => {
                self.put(
                    paths::resource_group(&sub, &a.name),
                    paths::RESOURCES_API_VERSION,
                    resource_group_body(a),
                    &a.name,
                    Some(a.location.as_str()),
                )
                .await?
            }
            ResourceArgs::StorageAccount(a) => {
                self.put(
                    paths::storage_account(&sub, &a.resource_group_name, &a.name),
                    paths::STORAGE_API_VERSION,
                    storage_account_body(a),
                    &a.name,
                    Some(a.location.as_str()),
                )
                .await?
            }
            ResourceArgs::BlobContainer(a) => {
                self.put(
                    paths::blob_container(&sub, &a.resource_group_name, &a.account_name, &a.name),
                    paths::STORAGE_API_VERSION,
                    json!({ "properties": {} }),
                    &a.name,
                    None,
                )
                .await?
            }
            ResourceArgs::AccountSas(a) => self.list_account_sas(a).await?,
            ResourceArgs::Gallery(a) => {
                self.put(
                    paths::gallery(&sub, &a.resource_group_name, &a.name),
                    paths::COMPUTE_GALLERY_API_VERSION,
                    gallery_body(a),
                    &a.name,
                    Some(a.location.as_str()),
                )
                .await?
            }
            ResourceArgs::GalleryImage(a) => {
                self.put(
                    paths::gallery_image(&sub, &a.resource_group_name, &a.gallery_name, &a.name),
                    paths::COMPUTE_GALLERY_API_VERSION,
                    gallery_image_body(a),
                    &a.name,
                    Some(a.location.as_str()),
                )
                .await?
            }
            ResourceArgs::GalleryImageVersion(a) => {
                self.put(
                    paths::gallery_image_version(
                        &sub,
                        &a.resource_group_name,
                        &a.gallery_name,
                        &a.image_name,
                        &a.name,
                    ),
                    paths::COMPUTE_GALLERY_API_VERSION,
                    gallery_image_version_body(a),
                    &a.name,
                    Some(a.location.as_str()),
                )
                .await?
            }
            ResourceArgs::Command(a) => {
                let output = self
                    .commands
                    .run(&a.create)
                    .await
                    .map_err(|e| redact_secrets(&e.to_string()))?;
                let mut outputs = PropertyMap::new();
                outputs.insert("stdout".to_string(), output.stdout);
                outputs
            }
        };

        Ok(outputs)
    }

    fn name(&self) -> &str {
        "azure-arm"
    }
}

pub fn resource_group_body(args: &ResourceGroupArgs<String>) -> Value {
    json!({ "location": args.location })
}

pub fn storage_account_body(args: &StorageAccountArgs<String>) -> Value {
    json!({
        "location": args.location,
        "kind": args.kind,
        "sku": { "name": args.sku },
        "properties": { "accessTier": args.access_tier }
    })
}

pub fn account_sas_body(args: &AccountSasArgs<String>) -> Value {
    json!({
        "signedServices": args.services,
        "signedResourceTypes": args.resource_types,
        "signedPermission": args.permissions,
        "signedProtocol": args.protocol,
        "signedExpiry": args.expiry
    })
}

pub fn gallery_body(args: &GalleryArgs<String>) -> Value {
    let mut properties = json!({ "description": args.description });
    if let Some(permissions) = args.sharing {
        properties["sharingProfile"] = json!({ "permissions": permissions });
    }
    json!({ "location": args.location, "properties": properties })
}

pub fn gallery_image_body(args: &GalleryImageArgs<String>) -> Value {
    json!({
        "location": args.location,
        "properties": {
            "description": args.description,
            "architecture": args.architecture,
            "hyperVGeneration": args.hyper_v_generation,
            "osType": args.os_type,
            "osState": args.os_state,
            "identifier": args.identifier
        }
    })
}

pub fn gallery_image_version_body(args: &GalleryImageVersionArgs<String>) -> Value {
    json!({
        "location": args.location,
        "properties": {
            "publishingProfile": {
                "storageAccountType": args.storage_account_type,
                "replicationMode": args.replication_mode,
                "targetRegions": args.target_regions
            },
            "storageProfile": {
                "osDiskImage": {
                    "source": {
                        "storageAccountId": args.source_storage_account_id,
                        "uri": args.source_uri
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resource::{
        AccessTier, Architecture, HyperVGeneration, ImageIdentifier, OsState, OsType,
        ReplicationMode, SharingPermission, StorageKind, StorageSku, TargetRegion,
    };

    #[test]
    fn test_storage_account_body() {
        let body = storage_account_body(&StorageAccountArgs {
            name: "cloudimportersa0a1b2c3d".to_string(),
            resource_group_name: "resourceGroup-1".to_string(),
            location: "westeurope".to_string(),
            access_tier: AccessTier::Hot,
            kind: StorageKind::StorageV2,
            sku: StorageSku::PremiumLrs,
        });

        assert_eq!(body["kind"], "StorageV2");
        assert_eq!(body["sku"]["name"], "Premium_LRS");
        assert_eq!(body["properties"]["accessTier"], "Hot");
        assert_eq!(body["location"], "westeurope");
    }

    #[test]
    fn test_gallery_body_sharing_profile_only_when_set() {
        let mut args = GalleryArgs {
            name: "img".to_string(),
            description: "img".to_string(),
            resource_group_name: "img-1".to_string(),
            location: "westeurope".to_string(),
            sharing: None,
        };
        assert!(gallery_body(&args)["properties"].get("sharingProfile").is_none());

        args.sharing = Some(SharingPermission::Groups);
        assert_eq!(
            gallery_body(&args)["properties"]["sharingProfile"]["permissions"],
            "Groups"
        );
    }

    #[test]
    fn test_gallery_image_body() {
        let body = gallery_image_body(&GalleryImageArgs {
            name: "img".to_string(),
            description: "img".to_string(),
            gallery_name: "img".to_string(),
            resource_group_name: "img-1".to_string(),
            location: "westeurope".to_string(),
            architecture: Architecture::Arm64,
            hyper_v_generation: HyperVGeneration::V2,
            os_type: OsType::Linux,
            os_state: OsState::Generalized,
            identifier: ImageIdentifier {
                publisher: "openshift-local".to_string(),
                offer: "snc".to_string(),
                sku: "openshift_local_snc".to_string(),
            },
        });

        let props = &body["properties"];
        assert_eq!(props["architecture"], "Arm64");
        assert_eq!(props["hyperVGeneration"], "V2");
        assert_eq!(props["osType"], "Linux");
        assert_eq!(props["osState"], "Generalized");
        assert_eq!(props["identifier"]["sku"], "openshift_local_snc");
    }

    #[test]
    fn test_gallery_image_version_body() {
        let body = gallery_image_version_body(&GalleryImageVersionArgs {
            name: "img".to_string(),
            gallery_name: "img".to_string(),
            image_name: "img".to_string(),
            resource_group_name: "img-1".to_string(),
            location: "westeurope".to_string(),
            storage_account_type: StorageSku::PremiumLrs,
            replication_mode: ReplicationMode::Full,
            target_regions: vec![TargetRegion::single_replica("eastus")],
            source_storage_account_id: "/subscriptions/s/sa".to_string(),
            source_uri: "https://sa.blob.core.windows.net/c/b.vhd".to_string(),
        });

        let props = &body["properties"];
        assert_eq!(props["publishingProfile"]["storageAccountType"], "Premium_LRS");
        assert_eq!(props["publishingProfile"]["replicationMode"], "Full");
        assert_eq!(props["publishingProfile"]["targetRegions"][0]["name"], "eastus");
        assert_eq!(
            props["storageProfile"]["osDiskImage"]["source"]["uri"],
            "https://sa.blob.core.windows.net/c/b.vhd"
        );
    }

    #[test]
    fn test_account_sas_body() {
        let body = account_sas_body(&AccountSasArgs {
            account_name: "sa".to_string(),
            resource_group_name: "rg".to_string(),
            permissions: "rw".to_string(),
            services: "b".to_string(),
            resource_types: "o".to_string(),
            protocol: "https".to_string(),
            expiry: "2024-01-01T02:00:00Z".to_string(),
        });
        assert_eq!(body["signedPermission"], "rw");
        assert_eq!(body["signedServices"], "b");
        assert_eq!(body["signedResourceTypes"], "o");
        assert_eq!(body["signedProtocol"], "https");
        assert_eq!(body["signedExpiry"], "2024-01-01T02:00:00Z");
    }
}
