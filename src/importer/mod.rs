//! Image import programs
//!
//! An ephemeral run stages a VHD in blob storage and exports the output
//! contract; a registration run reads that contract and publishes the VHD as
//! a gallery image version.

pub mod bundle;
pub mod contract;
pub mod ephemeral;
pub mod error;
pub mod gallery;
pub mod storage;
pub mod upload;

pub use bundle::{BundleDescriber, BundleExtraction, FileNameDescriber};
pub use contract::{ContractError, OutputContract, RegisterRequest, CONTRACT_KEYS};
pub use ephemeral::{ArtifactSource, BundleSource, EphemeralBuild, LocalArtifact, RawImageSource};
pub use error::ImportError;
pub use gallery::{GalleryPublisher, ShareGalleryStep};
