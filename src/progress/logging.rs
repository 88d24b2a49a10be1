//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { stack, resources } => {
                info!(stack = %stack, resources, "Applying stack");
            }
            ProgressEvent::WaveStarted { index, resources } => {
                debug!(wave = index, resources, "Applying dependency wave");
            }
            ProgressEvent::ResourceStarted { id, kind } => {
                info!(resource = %id, kind = %kind, "Creating resource");
            }
            ProgressEvent::ResourceCreated { id, kind, duration } => {
                info!(
                    resource = %id,
                    kind = %kind,
                    duration_ms = duration.as_millis(),
                    "Resource created"
                );
            }
            ProgressEvent::ResourceFailed { id, kind, error } => {
                warn!(resource = %id, kind = %kind, error = %error, "Resource creation failed");
            }
            ProgressEvent::PostStepStarted { step } => {
                info!(step = %step, "Running post-apply step");
            }
            ProgressEvent::PostStepComplete {
                step,
                duration,
                success,
            } => {
                if *success {
                    info!(
                        step = %step,
                        duration_ms = duration.as_millis(),
                        "Post-apply step complete"
                    );
                } else {
                    warn!(
                        step = %step,
                        duration_ms = duration.as_millis(),
                        "Post-apply step failed"
                    );
                }
            }
            ProgressEvent::Completed {
                stack,
                resources,
                total_time,
            } => {
                info!(
                    stack = %stack,
                    resources,
                    total_time_ms = total_time.as_millis(),
                    "Stack applied"
                );
            }
            ProgressEvent::Failed { stack, error } => {
                warn!(stack = %stack, error = %error, "Stack failed");
            }
        }
    }
}
