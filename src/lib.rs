//! cloud-importer - publish disk images as Azure compute gallery images
//!
//! Publication happens in two runs. An ephemeral run uploads a VHD (a local
//! image, or one extracted from an OpenShift Local bundle) into a fresh
//! storage account and exports an output contract. A registration run reads
//! that contract and creates a gallery, an image definition and an image
//! version, optionally replicated to every region and shared with a tenant.
//!
//! # Core Concepts
//!
//! - **Stack**: the resources, exports and post-apply steps a program declares
//! - **Engine**: applies a stack in dependency waves against a provider
//! - **Output contract**: the seven string outputs linking the two runs
//!
//! # Example Usage
//!
//! ```ignore
//! use cloud_importer::{Engine, EphemeralBuild, RawImageSource, Stack};
//! use cloud_importer::pipeline::MockProvider;
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Arc::new(MockProvider::new()));
//! let program = EphemeralBuild::new(RawImageSource::new("disk.vhd", "rhelai-1.2"));
//! let result = engine.up(Stack::new("ephemeral-raw", "eastus"), &program).await?;
//! result.outputs.save("outputs.json".as_ref())?;
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: declarative resource graph and its engine
//! - [`azure`]: ARM client, credentials, regions and gallery sharing
//! - [`importer`]: the ephemeral and registration programs
//! - [`cli`]: command-line surface

pub mod azure;
pub mod cli;
pub mod config;
pub mod importer;
pub mod pipeline;
pub mod progress;
pub mod util;

pub use config::{ConfigError, ImporterConfig};
pub use importer::{
    BundleSource, EphemeralBuild, GalleryPublisher, ImportError, OutputContract, RawImageSource,
    RegisterRequest,
};
pub use pipeline::{Engine, EngineError, Stack, StackOutputs, UpResult};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
