//! Ephemeral runs: stage a disk image in blob storage
//!
//! Both variants share [`EphemeralBuild`]; they differ only in the image
//! family they publish under and how the local VHD comes to exist.

use super::bundle::{BundleDescriber, BundleExtraction};
use super::contract::{
    OUT_ARCH, OUT_BLOB_URI, OUT_NAME, OUT_OFFER, OUT_PUBLISHER, OUT_SKU, OUT_STORAGE_ACCOUNT_ID,
};
use super::error::ImportError;
use super::storage::{blob_name, declare_sas, declare_storage};
use super::upload::declare_upload;
use crate::pipeline::input::Input;
use crate::pipeline::resource::{ImageIdentifier, ResourceId};
use crate::pipeline::stack::{Program, Stack};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub const RHELAI_OFFER: &str = "rhelai";
pub const RHELAI_PUBLISHER: &str = "aipcc-cicd";
pub const RHELAI_SKU: &str = "rhelai";

pub const SNC_OFFER: &str = "snc";
pub const SNC_PUBLISHER: &str = "openshift-local";
pub const SNC_SKU: &str = "openshift_local_snc";

pub const DEFAULT_ARCH: &str = "x86_64";

/// A local disk image ready for upload
#[derive(Debug, Clone)]
pub struct LocalArtifact {
    pub name: String,
    pub arch: String,
    /// Path handed to `azcopy`
    pub source: Input,
    /// Resources that must exist before the upload starts
    pub depends_on: Vec<ResourceId>,
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    fn family(&self) -> &str;

    fn identity(&self) -> ImageIdentifier;

    /// Declares whatever produces the VHD and describes the result
    async fn produce_local_artifact(&self, stack: &mut Stack) -> Result<LocalArtifact, ImportError>;
}

/// A VHD the caller already has on disk
#[derive(Debug, Clone)]
pub struct RawImageSource {
    vhd_path: String,
    image_name: String,
    arch: String,
}

impl RawImageSource {
    pub fn new(vhd_path: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            vhd_path: vhd_path.into(),
            image_name: image_name.into(),
            arch: DEFAULT_ARCH.to_string(),
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }
}

#[async_trait]
impl ArtifactSource for RawImageSource {
    fn family(&self) -> &str {
        "rhelai"
    }

    fn identity(&self) -> ImageIdentifier {
        ImageIdentifier {
            publisher: RHELAI_PUBLISHER.to_string(),
            offer: RHELAI_OFFER.to_string(),
            sku: RHELAI_SKU.to_string(),
        }
    }

    async fn produce_local_artifact(&self, _stack: &mut Stack) -> Result<LocalArtifact, ImportError> {
        Ok(LocalArtifact {
            name: self.image_name.clone(),
            arch: self.arch.clone(),
            source: Input::known(self.vhd_path.as_str()),
            depends_on: Vec::new(),
        })
    }
}

/// An OpenShift Local bundle extracted to a VHD during the run
pub struct BundleSource {
    bundle_uri: String,
    shasum_uri: String,
    arch: String,
    describer: Arc<dyn BundleDescriber>,
    extraction: BundleExtraction,
}

impl BundleSource {
    pub fn new(
        bundle_uri: impl Into<String>,
        shasum_uri: impl Into<String>,
        arch: impl Into<String>,
        describer: Arc<dyn BundleDescriber>,
        extraction: BundleExtraction,
    ) -> Self {
        Self {
            bundle_uri: bundle_uri.into(),
            shasum_uri: shasum_uri.into(),
            arch: arch.into(),
            describer,
            extraction,
        }
    }
}

#[async_trait]
impl ArtifactSource for BundleSource {
    fn family(&self) -> &str {
        "snc"
    }

    fn identity(&self) -> ImageIdentifier {
        ImageIdentifier {
            publisher: SNC_PUBLISHER.to_string(),
            offer: SNC_OFFER.to_string(),
            sku: SNC_SKU.to_string(),
        }
    }

    async fn produce_local_artifact(&self, stack: &mut Stack) -> Result<LocalArtifact, ImportError> {
        let base = self.describer.describe(&self.bundle_uri).await?;
        let extract = self
            .extraction
            .declare(stack, &self.bundle_uri, &self.shasum_uri)?;

        Ok(LocalArtifact {
            name: format!("{}-{}", base, self.arch),
            arch: self.arch.clone(),
            source: Input::known(self.extraction.extracted_vhd().display().to_string()),
            depends_on: vec![extract.id().clone()],
        })
    }
}

/// Stages an artifact and exports the output contract
pub struct EphemeralBuild<A> {
    source: A,
}

impl<A: ArtifactSource> EphemeralBuild<A> {
    pub fn new(source: A) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &A {
        &self.source
    }
}

#[async_trait]
impl<A: ArtifactSource> Program for EphemeralBuild<A> {
    type Error = ImportError;

    async fn run(&self, stack: &mut Stack) -> Result<(), ImportError> {
        let identity = self.source.identity();
        stack.export(OUT_OFFER, identity.offer.as_str());
        stack.export(OUT_PUBLISHER, identity.publisher.as_str());
        stack.export(OUT_SKU, identity.sku.as_str());

        let artifact = self.source.produce_local_artifact(stack).await?;
        info!(
            family = self.source.family(),
            image = %artifact.name,
            arch = %artifact.arch,
            "Declaring ephemeral upload"
        );
        stack.export(OUT_NAME, artifact.name.as_str());
        stack.export(OUT_ARCH, artifact.arch.as_str());

        let storage = declare_storage(stack)?;
        stack.export(OUT_STORAGE_ACCOUNT_ID, storage.account.arm_id());

        let blob = blob_name();
        let sas = declare_sas(stack, &storage, Utc::now())?;
        stack.export(OUT_BLOB_URI, storage.blob_uri(&blob));

        let mut depends_on: Vec<&ResourceId> = storage.ids().to_vec();
        depends_on.extend(artifact.depends_on.iter());
        declare_upload(
            stack,
            artifact.source,
            storage.signed_url(&blob, &sas),
            depends_on,
        )?;

        Ok(())
    }
}
