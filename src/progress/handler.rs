//! Progress handler trait and events

use crate::pipeline::{ResourceId, ResourceKind};
use std::time::Duration;

/// Events emitted while a stack is applied
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Stack application started
    Started { stack: String, resources: usize },

    /// A dependency wave is about to be applied
    WaveStarted { index: usize, resources: usize },

    /// Resource creation submitted to the provider
    ResourceStarted { id: ResourceId, kind: ResourceKind },

    /// Resource created
    ResourceCreated {
        id: ResourceId,
        kind: ResourceKind,
        duration: Duration,
    },

    /// Resource creation failed
    ResourceFailed {
        id: ResourceId,
        kind: ResourceKind,
        error: String,
    },

    /// Post-apply step started
    PostStepStarted { step: String },

    /// Post-apply step finished
    PostStepComplete {
        step: String,
        duration: Duration,
        success: bool,
    },

    /// Stack applied successfully
    Completed {
        stack: String,
        resources: usize,
        total_time: Duration,
    },

    /// Stack application failed
    Failed { stack: String, error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
