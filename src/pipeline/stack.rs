//! Stack declaration context

use super::error::EngineError;
use super::input::Input;
use super::provider::PostStep;
use super::resource::{ResourceArgs, ResourceDeclaration, ResourceId, ResourceOptions, ResourceRef};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Declares resources, exports and post-apply steps into a [`Stack`]
#[async_trait]
pub trait Program: Send + Sync {
    type Error: From<EngineError> + Send;

    async fn run(&self, stack: &mut Stack) -> Result<(), Self::Error>;
}

/// The set of declarations a program produced, not yet applied
pub struct Stack {
    name: String,
    location: String,
    resources: Vec<ResourceDeclaration>,
    exports: Vec<(String, Input)>,
    post_steps: Vec<Arc<dyn PostStep>>,
}

impl Stack {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            resources: Vec::new(),
            exports: Vec::new(),
            post_steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default location for resources that do not inherit one
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn declare(
        &mut self,
        id: impl Into<String>,
        args: ResourceArgs<Input>,
        options: ResourceOptions,
    ) -> Result<ResourceRef, EngineError> {
        let id = ResourceId::new(id);
        if self.resources.iter().any(|r| r.id == id) {
            return Err(EngineError::DuplicateResource(id));
        }

        let kind = args.kind();
        self.resources.push(ResourceDeclaration {
            id: id.clone(),
            args,
            options,
        });

        Ok(ResourceRef::new(id, kind))
    }

    /// Exports a value under `key`; a later export of the same key wins
    pub fn export(&mut self, key: impl Into<String>, value: impl Into<Input>) {
        let key = key.into();
        self.exports.retain(|(k, _)| *k != key);
        self.exports.push((key, value.into()));
    }

    pub fn after_apply(&mut self, step: Arc<dyn PostStep>) {
        self.post_steps.push(step);
    }

    pub fn resources(&self) -> &[ResourceDeclaration] {
        &self.resources
    }

    pub fn exports(&self) -> &[(String, Input)] {
        &self.exports
    }

    pub fn post_steps(&self) -> &[Arc<dyn PostStep>] {
        &self.post_steps
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// Groups resource indices into waves; every resource's dependencies
    /// live in earlier waves. Declaration order is kept inside a wave.
    pub fn execution_plan(&self) -> Result<Vec<Vec<usize>>, EngineError> {
        let index: HashMap<&ResourceId, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.id, i))
            .collect();

        let mut pending: Vec<(usize, Vec<usize>)> = Vec::with_capacity(self.resources.len());
        for (i, resource) in self.resources.iter().enumerate() {
            let mut deps = Vec::new();
            for dep in resource.dependencies() {
                let dep_index = *index.get(&dep).ok_or_else(|| EngineError::UnknownDependency {
                    resource: resource.id.clone(),
                    dependency: dep.clone(),
                })?;
                deps.push(dep_index);
            }
            pending.push((i, deps));
        }

        let mut done: HashSet<usize> = HashSet::new();
        let mut waves = Vec::new();

        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, deps)| deps.iter().all(|d| done.contains(d)));

            if ready.is_empty() {
                return Err(EngineError::DependencyCycle(
                    blocked
                        .iter()
                        .map(|(i, _)| self.resources[*i].id.clone())
                        .collect(),
                ));
            }

            let wave: Vec<usize> = ready.into_iter().map(|(i, _)| i).collect();
            done.extend(wave.iter().copied());
            waves.push(wave);
            pending = blocked;
        }

        Ok(waves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resource::{CommandArgs, ResourceGroupArgs};

    fn command(create: Input) -> ResourceArgs {
        ResourceArgs::Command(CommandArgs { create })
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut stack = Stack::new("test", "westeurope");
        stack
            .declare("cmd", command(Input::known("true")), ResourceOptions::new())
            .unwrap();
        let err = stack
            .declare("cmd", command(Input::known("true")), ResourceOptions::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateResource(id) if id.as_str() == "cmd"));
    }

    #[test]
    fn test_plan_orders_by_dependencies() {
        let mut stack = Stack::new("test", "westeurope");
        let rg = stack
            .declare(
                "rg",
                ResourceArgs::ResourceGroup(ResourceGroupArgs {
                    name: Input::known("rg-1"),
                    location: Input::known("westeurope"),
                }),
                ResourceOptions::new(),
            )
            .unwrap();
        let independent = stack
            .declare("independent", command(Input::known("true")), ResourceOptions::new())
            .unwrap();
        stack
            .declare(
                "uses-rg",
                command(Input::format("echo {}", vec![rg.name()])),
                ResourceOptions::new(),
            )
            .unwrap();
        stack
            .declare(
                "after-independent",
                command(Input::known("true")),
                ResourceOptions::new().depends_on([independent.id()]),
            )
            .unwrap();

        let plan = stack.execution_plan().unwrap();
        assert_eq!(plan, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_plan_rejects_unknown_dependency() {
        let mut stack = Stack::new("test", "westeurope");
        stack
            .declare(
                "cmd",
                command(Input::output(ResourceId::new("ghost"), "name")),
                ResourceOptions::new(),
            )
            .unwrap();

        let err = stack.execution_plan().unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownDependency { ref dependency, .. } if dependency.as_str() == "ghost"
        ));
    }

    #[test]
    fn test_plan_rejects_cycles() {
        let mut stack = Stack::new("test", "westeurope");
        stack
            .declare(
                "a",
                command(Input::output(ResourceId::new("b"), "stdout")),
                ResourceOptions::new(),
            )
            .unwrap();
        stack
            .declare(
                "b",
                command(Input::output(ResourceId::new("a"), "stdout")),
                ResourceOptions::new(),
            )
            .unwrap();

        let err = stack.execution_plan().unwrap_err();
        match err {
            EngineError::DependencyCycle(ids) => assert_eq!(ids.len(), 2),
            other => panic!("Expected DependencyCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_export_replaces_previous_value() {
        let mut stack = Stack::new("test", "westeurope");
        stack.export("name", "first");
        stack.export("name", "second");
        assert_eq!(stack.exports().len(), 1);
        assert_eq!(stack.exports()[0].1, Input::known("second"));
    }
}
