//! Declarative resource engine
//!
//! Programs declare resources into a [`Stack`]; the [`Engine`] resolves the
//! dependency graph and applies it through a [`ResourceProvider`].

pub mod command;
pub mod engine;
pub mod error;
pub mod input;
pub mod mock;
pub mod outputs;
pub mod provider;
pub mod resource;
pub mod stack;

pub use command::{redact_secrets, CommandError, CommandOutput, CommandRunner, ShellCommandRunner};
pub use engine::{Engine, ResourceState, UpResult, REDACTED};
pub use error::EngineError;
pub use input::{Input, PropertyMap, ResolvedOutputs};
pub use mock::MockProvider;
pub use outputs::{OutputsError, StackOutputs};
pub use provider::{PostStep, ProviderError, ResourceProvider};
pub use resource::{ResourceArgs, ResourceId, ResourceKind, ResourceOptions, ResourceRef};
pub use stack::{Program, Stack};
