//! Registration: publish a staged VHD as a gallery image version
//!
//! Declares `rg` → `gallery` → `image` → `GalleryImageVer`. With
//! `replicate` the version targets every region of the subscription,
//! otherwise only the stack location. When an org tenant is given the gallery
//! is created with `Groups` sharing and a post-apply step grants the tenant
//! access once the gallery exists.

use super::contract::RegisterRequest;
use super::error::ImportError;
use super::storage::randomize;
use crate::azure::locations::RegionLookup;
use crate::azure::sharing::GallerySharing;
use crate::pipeline::input::{Input, ResolvedOutputs};
use crate::pipeline::provider::{PostStep, ProviderError};
use crate::pipeline::resource::{
    Architecture, GalleryArgs, GalleryImageArgs, GalleryImageVersionArgs, HyperVGeneration,
    ImageIdentifier, OsState, OsType, ReplicationMode, ResourceArgs, ResourceGroupArgs,
    ResourceOptions, SharingPermission, StorageSku, TargetRegion,
};
use crate::pipeline::stack::{Program, Stack};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const RESOURCE_GROUP_RESOURCE: &str = "rg";
pub const GALLERY_RESOURCE: &str = "gallery";
pub const IMAGE_RESOURCE: &str = "image";
pub const IMAGE_VERSION_RESOURCE: &str = "GalleryImageVer";

pub const OUT_IMAGE_VERSION_ID: &str = "galleryImageVersionId";

pub struct GalleryPublisher {
    request: RegisterRequest,
    regions: Arc<dyn RegionLookup>,
    sharing: Arc<dyn GallerySharing>,
}

impl GalleryPublisher {
    pub fn new(
        request: RegisterRequest,
        regions: Arc<dyn RegionLookup>,
        sharing: Arc<dyn GallerySharing>,
    ) -> Self {
        Self {
            request,
            regions,
            sharing,
        }
    }

    async fn target_regions(&self, location: &str) -> Result<Vec<TargetRegion>, ImportError> {
        if self.request.replicate() {
            Ok(self.regions.target_regions().await?)
        } else {
            Ok(vec![TargetRegion::single_replica(location)])
        }
    }
}

#[async_trait]
impl Program for GalleryPublisher {
    type Error = ImportError;

    async fn run(&self, stack: &mut Stack) -> Result<(), ImportError> {
        let request = &self.request;
        let contract = request.contract();
        let name = request.name();
        let location = stack.location().to_string();

        let rg = stack.declare(
            RESOURCE_GROUP_RESOURCE,
            ResourceArgs::ResourceGroup(ResourceGroupArgs {
                name: Input::known(randomize(name)),
                location: Input::known(location.as_str()),
            }),
            ResourceOptions::new(),
        )?;

        let gallery = stack.declare(
            GALLERY_RESOURCE,
            ResourceArgs::Gallery(GalleryArgs {
                name: Input::known(name),
                description: Input::known(name),
                resource_group_name: rg.name(),
                location: rg.location(),
                sharing: request.org_tenant_id().map(|_| SharingPermission::Groups),
            }),
            ResourceOptions::new(),
        )?;

        let image = stack.declare(
            IMAGE_RESOURCE,
            ResourceArgs::GalleryImage(GalleryImageArgs {
                name: Input::known(name),
                description: Input::known(name),
                gallery_name: gallery.name(),
                resource_group_name: rg.name(),
                location: rg.location(),
                architecture: Architecture::from_arch(request.arch()),
                hyper_v_generation: HyperVGeneration::V2,
                os_type: OsType::Linux,
                os_state: OsState::Generalized,
                identifier: ImageIdentifier {
                    publisher: contract.publisher.clone(),
                    offer: contract.offer.clone(),
                    sku: contract.sku.clone(),
                },
            }),
            ResourceOptions::new(),
        )?;

        let target_regions = self.target_regions(&location).await?;
        info!(
            image = name,
            replicate = request.replicate(),
            regions = target_regions.len(),
            "Declaring gallery image version"
        );

        let version = stack.declare(
            IMAGE_VERSION_RESOURCE,
            ResourceArgs::GalleryImageVersion(GalleryImageVersionArgs {
                name: Input::known(name),
                gallery_name: gallery.name(),
                image_name: image.name(),
                resource_group_name: rg.name(),
                location: rg.location(),
                storage_account_type: StorageSku::PremiumLrs,
                replication_mode: ReplicationMode::Full,
                target_regions,
                source_storage_account_id: Input::known(contract.storage_account_id.as_str()),
                source_uri: Input::known(contract.blob_uri.as_str()),
            }),
            ResourceOptions::new(),
        )?;
        stack.export(OUT_IMAGE_VERSION_ID, version.arm_id());

        if let Some(tenant_id) = request.org_tenant_id() {
            stack.after_apply(Arc::new(ShareGalleryStep {
                tenant_id: tenant_id.to_string(),
                resource_group: rg.name(),
                gallery: gallery.name(),
                sharing: Arc::clone(&self.sharing),
            }));
        }

        Ok(())
    }
}

/// Grants an AAD tenant access to the created gallery
pub struct ShareGalleryStep {
    tenant_id: String,
    resource_group: Input,
    gallery: Input,
    sharing: Arc<dyn GallerySharing>,
}

#[async_trait]
impl PostStep for ShareGalleryStep {
    fn name(&self) -> &str {
        "share-gallery"
    }

    async fn run(&self, outputs: &ResolvedOutputs) -> Result<(), ProviderError> {
        let resource_group = self.resource_group.resolve(outputs)?;
        let gallery = self.gallery.resolve(outputs)?;
        self.sharing
            .share(&self.tenant_id, &resource_group, &gallery)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::locations::SourceRegionLookup;
    use crate::azure::mock::{MockLocationSource, RecordingSharing};
    use crate::importer::contract::OutputContract;
    use crate::pipeline::resource::ResourceId;

    fn request(arch: &str, replicate: bool, tenant: Option<&str>) -> RegisterRequest {
        RegisterRequest::new(
            OutputContract {
                name: "snc-x86_64".to_string(),
                arch: arch.to_string(),
                offer: "snc".to_string(),
                publisher: "openshift-local".to_string(),
                sku: "openshift_local_snc".to_string(),
                storage_account_id: "/subscriptions/s/sa".to_string(),
                blob_uri: "https://sa.blob.core.windows.net/c/b.vhd".to_string(),
            },
            replicate,
            tenant.map(str::to_string),
        )
    }

    fn publisher(request: RegisterRequest, pages: Vec<Option<Vec<&str>>>) -> GalleryPublisher {
        GalleryPublisher::new(
            request,
            Arc::new(SourceRegionLookup::new(Arc::new(MockLocationSource::new(pages)))),
            Arc::new(RecordingSharing::new()),
        )
    }

    fn version_args(stack: &Stack) -> GalleryImageVersionArgs {
        match &stack
            .resource(&ResourceId::new(IMAGE_VERSION_RESOURCE))
            .unwrap()
            .args
        {
            ResourceArgs::GalleryImageVersion(args) => args.clone(),
            other => panic!("Expected image version, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_without_replication_targets_stack_location() {
        let program = publisher(request("x86_64", false, None), vec![Some(vec!["eastus"])]);
        let mut stack = Stack::new("register", "westeurope");
        program.run(&mut stack).await.unwrap();

        assert_eq!(
            version_args(&stack).target_regions,
            vec![TargetRegion::single_replica("westeurope")]
        );
        assert!(stack.post_steps().is_empty());
    }

    #[tokio::test]
    async fn test_replication_targets_every_region() {
        let program = publisher(
            request("aarch64", true, Some("tenant-1")),
            vec![Some(vec!["eastus", "westus"]), Some(vec!["westeurope"])],
        );
        let mut stack = Stack::new("register", "westeurope");
        program.run(&mut stack).await.unwrap();

        let names: Vec<String> = version_args(&stack)
            .target_regions
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["eastus", "westus", "westeurope"]);
        assert_eq!(stack.post_steps().len(), 1);

        match &stack.resource(&ResourceId::new(IMAGE_RESOURCE)).unwrap().args {
            ResourceArgs::GalleryImage(args) => assert_eq!(args.architecture, Architecture::Arm64),
            other => panic!("Expected image, got {:?}", other),
        }
        match &stack.resource(&ResourceId::new(GALLERY_RESOURCE)).unwrap().args {
            ResourceArgs::Gallery(args) => assert_eq!(args.sharing, Some(SharingPermission::Groups)),
            other => panic!("Expected gallery, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_region_failure_fails_declaration() {
        let program = publisher(request("x86_64", true, None), vec![Some(vec!["eastus"]), None]);
        let mut stack = Stack::new("register", "westeurope");
        let err = program.run(&mut stack).await.unwrap_err();

        assert!(matches!(err, ImportError::Azure(_)));
        assert!(stack
            .resource(&ResourceId::new(IMAGE_VERSION_RESOURCE))
            .is_none());
    }
}
