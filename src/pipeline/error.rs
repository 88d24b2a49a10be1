//! Engine errors

use super::engine::ResourceState;
use super::resource::{ResourceId, ResourceKind};
use thiserror::Error;

/// Errors raised while declaring or applying a stack
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two resources were declared with the same logical id
    #[error("Duplicate resource id: {0}")]
    DuplicateResource(ResourceId),

    /// A dependency (explicit or through an input) names an undeclared resource
    #[error("Resource {resource} depends on undeclared resource {dependency}")]
    UnknownDependency {
        resource: ResourceId,
        dependency: ResourceId,
    },

    /// The declared resources do not form a DAG
    #[error("Dependency cycle detected among resources: {}", format_ids(.0))]
    DependencyCycle(Vec<ResourceId>),

    /// An input referenced an output property the resource did not produce
    #[error("Resource {resource} has no output named '{property}'")]
    MissingOutputProperty {
        resource: ResourceId,
        property: String,
    },

    /// An input referenced a resource that has not been applied yet
    #[error("Output of resource {0} is not resolved yet")]
    Unresolved(ResourceId),

    /// The provider failed to create a resource
    #[error("Failed to create {kind} {resource}: {message}")]
    Provisioning {
        resource: ResourceId,
        kind: ResourceKind,
        message: String,
    },

    /// A post-apply task failed
    #[error("Post-apply step '{step}' failed: {message}")]
    PostStep { step: String, message: String },

    /// A post-apply task panicked or was cancelled
    #[error("Post-apply step '{step}' did not complete: {message}")]
    PostStepAborted { step: String, message: String },

    /// A failure after some resources were already created
    #[error("{cause} ({} resource(s) were created and left in place)", .applied.len())]
    Apply {
        cause: Box<EngineError>,
        applied: Vec<ResourceState>,
    },
}

impl EngineError {
    /// Resources created before the failure, empty when nothing was applied
    pub fn applied(&self) -> &[ResourceState] {
        match self {
            EngineError::Apply { applied, .. } => applied.as_slice(),
            _ => &[],
        }
    }

    /// The failure itself, without the applied-state wrapper
    pub fn failure(&self) -> &EngineError {
        match self {
            EngineError::Apply { cause, .. } => cause.as_ref(),
            other => other,
        }
    }
}

fn format_ids(ids: &[ResourceId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
