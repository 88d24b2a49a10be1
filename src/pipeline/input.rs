//! Resource inputs that may depend on other resources' outputs
//!
//! An [`Input`] is either a value known at declaration time, a reference to
//! an output property of another resource, or a concatenation of both. The
//! engine resolves inputs once every referenced resource has been applied,
//! and derives implicit dependency edges from the references.

use super::error::EngineError;
use super::resource::ResourceId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Output properties produced by a single applied resource
pub type PropertyMap = BTreeMap<String, String>;

/// A possibly-unresolved string value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Known(String),
    Output {
        resource: ResourceId,
        property: String,
    },
    Concat(Vec<Input>),
}

impl Input {
    pub fn known(value: impl Into<String>) -> Self {
        Input::Known(value.into())
    }

    pub fn output(resource: ResourceId, property: impl Into<String>) -> Self {
        Input::Output {
            resource,
            property: property.into(),
        }
    }

    /// Builds an input from a `{}`-placeholder template
    ///
    /// Each `{}` is replaced by the next argument in order. Placeholders
    /// without a matching argument are kept literally, surplus arguments are
    /// ignored.
    pub fn format(template: &str, args: impl IntoIterator<Item = Input>) -> Self {
        let mut args = args.into_iter();
        let mut parts = Vec::new();
        let mut rest = template;

        while let Some(pos) = rest.find("{}") {
            if pos > 0 {
                parts.push(Input::known(&rest[..pos]));
            }
            match args.next() {
                Some(arg) => parts.push(arg),
                None => parts.push(Input::known("{}")),
            }
            rest = &rest[pos + 2..];
        }
        if !rest.is_empty() {
            parts.push(Input::known(rest));
        }

        Input::Concat(parts)
    }

    /// Returns the value if it needs no resolution
    pub fn as_known(&self) -> Option<String> {
        match self {
            Input::Known(value) => Some(value.clone()),
            Input::Output { .. } => None,
            Input::Concat(parts) => parts
                .iter()
                .map(Input::as_known)
                .collect::<Option<Vec<_>>>()
                .map(|values| values.concat()),
        }
    }

    /// Resources whose outputs this input reads
    pub fn references(&self) -> Vec<ResourceId> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<ResourceId>) {
        match self {
            Input::Known(_) => {}
            Input::Output { resource, .. } => {
                if !refs.contains(resource) {
                    refs.push(resource.clone());
                }
            }
            Input::Concat(parts) => {
                for part in parts {
                    part.collect_references(refs);
                }
            }
        }
    }

    pub fn resolve(&self, outputs: &ResolvedOutputs) -> Result<String, EngineError> {
        match self {
            Input::Known(value) => Ok(value.clone()),
            Input::Output { resource, property } => outputs.get(resource, property),
            Input::Concat(parts) => {
                let mut value = String::new();
                for part in parts {
                    value.push_str(&part.resolve(outputs)?);
                }
                Ok(value)
            }
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::known(value)
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Known(value)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Known(value) => write!(f, "{}", value),
            Input::Output { resource, property } => write!(f, "${{{}.{}}}", resource, property),
            Input::Concat(parts) => {
                for part in parts {
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

/// Outputs of every resource applied so far
#[derive(Debug, Clone, Default)]
pub struct ResolvedOutputs {
    resources: HashMap<ResourceId, PropertyMap>,
}

impl ResolvedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: ResourceId, properties: PropertyMap) {
        self.resources.insert(resource, properties);
    }

    pub fn properties(&self, resource: &ResourceId) -> Option<&PropertyMap> {
        self.resources.get(resource)
    }

    pub fn get(&self, resource: &ResourceId, property: &str) -> Result<String, EngineError> {
        let properties = self
            .resources
            .get(resource)
            .ok_or_else(|| EngineError::Unresolved(resource.clone()))?;

        properties
            .get(property)
            .cloned()
            .ok_or_else(|| EngineError::MissingOutputProperty {
                resource: resource.clone(),
                property: property.to_string(),
            })
    }
}
