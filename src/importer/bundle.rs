//! OpenShift Local bundle handling
//!
//! A bundle is turned into a VHD by an external extraction tool, declared as
//! a command resource. The tool is invoked through a template with these
//! placeholders:
//!
//! - `{bundle_uri}` / `{shasum_uri}`: the bundle and its checksum file
//! - `{provider}`: always `azure`
//! - `{output_dir}`: directory the VHD is extracted into

use super::error::ImportError;
use super::storage::randomize;
use crate::pipeline::error::EngineError;
use crate::pipeline::input::Input;
use crate::pipeline::resource::{CommandArgs, ResourceArgs, ResourceOptions, ResourceRef};
use crate::pipeline::stack::Stack;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

pub const EXTRACT_RESOURCE: &str = "bundle-extract";

/// File name of the disk image the extraction tool produces
pub const EXTRACTED_VHD_FILE_NAME: &str = "disk.vhd";

pub const DEFAULT_EXTRACT_TEMPLATE: &str =
    "bundle-extract --bundle {bundle_uri} --shasum {shasum_uri} --provider {provider} --output {output_dir}";

const PROVIDER: &str = "azure";

/// Derives the image base name from a bundle location
#[async_trait]
pub trait BundleDescriber: Send + Sync {
    async fn describe(&self, bundle_uri: &str) -> Result<String, ImportError>;
}

/// Base name is the bundle file name without its extension
pub struct FileNameDescriber;

#[async_trait]
impl BundleDescriber for FileNameDescriber {
    async fn describe(&self, bundle_uri: &str) -> Result<String, ImportError> {
        let file_name = match Url::parse(bundle_uri) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string),
            Err(_) => Path::new(bundle_uri)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        };

        let stem = file_name
            .as_deref()
            .map(|name| Path::new(name).file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default()
            .filter(|s| !s.is_empty());

        stem.ok_or_else(|| ImportError::BundleDescription {
            uri: bundle_uri.to_string(),
            message: "no file name in bundle location".to_string(),
        })
    }
}

/// Extraction command settings
#[derive(Debug, Clone)]
pub struct BundleExtraction {
    template: String,
    output_dir: PathBuf,
}

impl BundleExtraction {
    pub fn new(template: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Settings for one run, extracting into a fresh `bundle-{8 hex}`
    /// directory under `work_dir` so concurrent runs never share a VHD
    pub fn for_run(template: impl Into<String>, work_dir: &Path) -> Self {
        Self::new(template, work_dir.join(randomize("bundle")))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn command(&self, bundle_uri: &str, shasum_uri: &str) -> String {
        self.template
            .replace("{bundle_uri}", bundle_uri)
            .replace("{shasum_uri}", shasum_uri)
            .replace("{provider}", PROVIDER)
            .replace("{output_dir}", &self.output_dir.display().to_string())
    }

    pub fn extracted_vhd(&self) -> PathBuf {
        self.output_dir.join(EXTRACTED_VHD_FILE_NAME)
    }

    pub fn declare(
        &self,
        stack: &mut Stack,
        bundle_uri: &str,
        shasum_uri: &str,
    ) -> Result<ResourceRef, EngineError> {
        stack.declare(
            EXTRACT_RESOURCE,
            ResourceArgs::Command(CommandArgs {
                create: Input::known(self.command(bundle_uri, shasum_uri)),
            }),
            ResourceOptions::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        https = { "https://mirror.openshift.com/pub/crc/4.15.0/crc_libvirt_4.15.0_amd64.crcbundle", "crc_libvirt_4.15.0_amd64" },
        query = { "https://example.com/b/crc_hyperv_4.14.1_arm64.crcbundle?token=abc", "crc_hyperv_4.14.1_arm64" },
        file_path = { "/data/bundles/crc_libvirt_4.15.0_amd64.crcbundle", "crc_libvirt_4.15.0_amd64" },
        no_extension = { "https://example.com/bundle", "bundle" },
    )]
    fn test_file_name_describer(uri: &str, expected: &str) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let name = rt.block_on(FileNameDescriber.describe(uri)).unwrap();
        assert_eq!(name, expected);
    }

    #[tokio::test]
    async fn test_describer_rejects_uri_without_file() {
        let err = FileNameDescriber.describe("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ImportError::BundleDescription { .. }));
    }

    #[test]
    fn test_extract_command_template() {
        let extraction = BundleExtraction::new(DEFAULT_EXTRACT_TEMPLATE, "/work");
        assert_eq!(
            extraction.command("https://x/b.crcbundle", "https://x/sha256sum.txt"),
            "bundle-extract --bundle https://x/b.crcbundle --shasum https://x/sha256sum.txt --provider azure --output /work"
        );
        assert_eq!(extraction.extracted_vhd(), PathBuf::from("/work/disk.vhd"));
    }

    #[test]
    fn test_runs_extract_into_separate_directories() {
        let first = BundleExtraction::for_run(DEFAULT_EXTRACT_TEMPLATE, Path::new("/work"));
        let second = BundleExtraction::for_run(DEFAULT_EXTRACT_TEMPLATE, Path::new("/work"));

        assert_ne!(first.output_dir(), second.output_dir());
        assert_ne!(first.extracted_vhd(), second.extracted_vhd());
        for extraction in [&first, &second] {
            assert_eq!(extraction.output_dir().parent(), Some(Path::new("/work")));
            assert!(extraction.extracted_vhd().starts_with(extraction.output_dir()));
            assert!(extraction
                .command("b", "s")
                .ends_with(&extraction.output_dir().display().to_string()));
        }
    }
}
