//! Stack application
//!
//! The engine applies a [`Stack`] against a [`ResourceProvider`]:
//!
//! 1. Validates the declarations and groups them into dependency waves
//! 2. Creates the resources of each wave concurrently, resolving inputs
//!    from the outputs of earlier waves
//! 3. Resolves the exported outputs
//! 4. Runs post-apply steps as tasks and joins their results
//!
//! The first failed wave aborts the run. Nothing that was already created is
//! rolled back; the failure carries the state of every applied resource so
//! teardown tooling can find them.

use super::command::redact_secrets;
use super::error::EngineError;
use super::input::{PropertyMap, ResolvedOutputs};
use super::outputs::StackOutputs;
use super::provider::ResourceProvider;
use super::resource::{ResourceDeclaration, ResourceId, ResourceKind};
use super::stack::{Program, Stack};
use crate::progress::{ProgressEvent, ProgressHandler};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// State of one applied resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub outputs: PropertyMap,
    pub retain_on_delete: bool,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct UpResult {
    pub stack: String,
    pub outputs: StackOutputs,
    pub resources: Vec<ResourceState>,
}

/// Placeholder for output values that hold credentials
pub const REDACTED: &str = "<redacted>";

impl ResourceState {
    /// Records `outputs` with secret properties masked and SAS signatures
    /// stripped from everything else
    pub fn new(declaration: &ResourceDeclaration, outputs: &PropertyMap) -> Self {
        let kind = declaration.kind();
        let secrets = kind.secret_outputs();
        let outputs = outputs
            .iter()
            .map(|(key, value)| {
                let shown = if secrets.contains(&key.as_str()) {
                    REDACTED.to_string()
                } else {
                    redact_secrets(value)
                };
                (key.clone(), shown)
            })
            .collect();

        Self {
            id: declaration.id.clone(),
            kind,
            outputs,
            retain_on_delete: declaration.options.retain_on_delete,
        }
    }
}

impl UpResult {
    pub fn resource(&self, id: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.id.as_str() == id)
    }
}

pub struct Engine {
    provider: Arc<dyn ResourceProvider>,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl Engine {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            provider,
            progress_handler: None,
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    /// Runs `program` against `stack` and applies what it declared
    pub async fn up<P: Program>(&self, mut stack: Stack, program: &P) -> Result<UpResult, P::Error> {
        program.run(&mut stack).await?;
        Ok(self.apply(stack).await?)
    }

    pub async fn apply(&self, stack: Stack) -> Result<UpResult, EngineError> {
        let start = Instant::now();
        let stack_name = stack.name().to_string();

        self.emit(ProgressEvent::Started {
            stack: stack_name.clone(),
            resources: stack.resources().len(),
        });

        let mut applied = Vec::with_capacity(stack.resources().len());
        match self.apply_inner(&stack, &mut applied).await {
            Ok(outputs) => {
                self.emit(ProgressEvent::Completed {
                    stack: stack_name.clone(),
                    resources: applied.len(),
                    total_time: start.elapsed(),
                });
                Ok(UpResult {
                    stack: stack_name,
                    outputs,
                    resources: applied,
                })
            }
            Err(e) => {
                self.emit(ProgressEvent::Failed {
                    stack: stack_name,
                    error: e.to_string(),
                });
                if applied.is_empty() {
                    Err(e)
                } else {
                    Err(EngineError::Apply {
                        cause: Box::new(e),
                        applied,
                    })
                }
            }
        }
    }

    async fn apply_inner(
        &self,
        stack: &Stack,
        applied: &mut Vec<ResourceState>,
    ) -> Result<StackOutputs, EngineError> {
        let plan = stack.execution_plan()?;
        info!(
            stack = stack.name(),
            provider = self.provider.name(),
            waves = plan.len(),
            "Applying stack"
        );

        let mut resolved = ResolvedOutputs::new();

        for (index, wave) in plan.iter().enumerate() {
            self.emit(ProgressEvent::WaveStarted {
                index,
                resources: wave.len(),
            });

            // Every creation in the wave runs to completion so nothing made
            // in Azure goes unrecorded
            let creations = wave
                .iter()
                .map(|&i| self.create(&stack.resources()[i], &resolved));
            let outcomes = join_all(creations).await;

            let mut first_error = None;
            for (&i, outcome) in wave.iter().zip(outcomes) {
                match outcome {
                    Ok(outputs) => {
                        let declaration = &stack.resources()[i];
                        applied.push(ResourceState::new(declaration, &outputs));
                        resolved.insert(declaration.id.clone(), outputs);
                    }
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut outputs = StackOutputs::new();
        for (key, input) in stack.exports() {
            outputs.insert(key.clone(), Value::String(input.resolve(&resolved)?));
        }

        self.run_post_steps(stack, resolved).await?;

        Ok(outputs)
    }

    async fn create(
        &self,
        declaration: &ResourceDeclaration,
        resolved: &ResolvedOutputs,
    ) -> Result<PropertyMap, EngineError> {
        let id = &declaration.id;
        let kind = declaration.kind();
        let args = declaration.args.resolve(resolved)?;

        self.emit(ProgressEvent::ResourceStarted {
            id: id.clone(),
            kind,
        });

        let start = Instant::now();
        match self.provider.create(id, &args).await {
            Ok(outputs) => {
                self.emit(ProgressEvent::ResourceCreated {
                    id: id.clone(),
                    kind,
                    duration: start.elapsed(),
                });
                debug!(resource = %id, outputs = ?outputs.keys().collect::<Vec<_>>(), "Resource outputs");
                Ok(outputs)
            }
            Err(e) => {
                self.emit(ProgressEvent::ResourceFailed {
                    id: id.clone(),
                    kind,
                    error: e.to_string(),
                });
                Err(EngineError::Provisioning {
                    resource: id.clone(),
                    kind,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn run_post_steps(&self, stack: &Stack, resolved: ResolvedOutputs) -> Result<(), EngineError> {
        if stack.post_steps().is_empty() {
            return Ok(());
        }

        let resolved = Arc::new(resolved);
        let mut tasks = Vec::with_capacity(stack.post_steps().len());

        for step in stack.post_steps() {
            let step = Arc::clone(step);
            let resolved = Arc::clone(&resolved);
            let name = step.name().to_string();
            self.emit(ProgressEvent::PostStepStarted { step: name.clone() });

            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let result = step.run(&resolved).await.map_err(|e| e.to_string());
                (result, start.elapsed())
            });
            tasks.push((name, handle));
        }

        let (names, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut first_error = None;
        for (name, outcome) in names.into_iter().zip(joined) {
            let error = match outcome {
                Ok((Ok(()), duration)) => {
                    self.emit(ProgressEvent::PostStepComplete {
                        step: name,
                        duration,
                        success: true,
                    });
                    continue;
                }
                Ok((Err(message), duration)) => {
                    self.emit(ProgressEvent::PostStepComplete {
                        step: name.clone(),
                        duration,
                        success: false,
                    });
                    EngineError::PostStep {
                        step: name,
                        message,
                    }
                }
                Err(join_error) => EngineError::PostStepAborted {
                    step: name,
                    message: join_error.to_string(),
                },
            };
            first_error.get_or_insert(error);
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}
