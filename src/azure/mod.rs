//! Azure Resource Manager access
//!
//! REST client, credential resolution, and the out-of-band operations the
//! declarative engine does not model: region enumeration and gallery sharing.
//! [`ArmProvider`] plugs the client into the engine as a resource provider.

pub mod arm;
pub mod credentials;
pub mod error;
pub mod locations;
pub mod mock;
pub mod paths;
pub mod provider;
pub mod sharing;

pub use arm::{ArmClient, ArmSettings};
pub use credentials::{
    CredentialError, CredentialResolver, DefaultCredentialChain, EnvironmentCredentialResolver,
    ResolvedCredential, StaticCredentialResolver, StaticTokenCredential, TokenCredential,
};
pub use error::AzureError;
pub use locations::{
    list_locations, to_target_regions, ArmRegionLookup, LocationPage, LocationSource, RegionLookup,
    SourceRegionLookup,
};
pub use mock::{MockLocationSource, RecordingSharing};
pub use provider::ArmProvider;
pub use sharing::{ArmGallerySharing, GallerySharing};
