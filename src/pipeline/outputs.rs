//! Exported stack outputs
//!
//! Outputs are the only channel between an ephemeral run and the
//! registration run that consumes it. Values stay dynamic JSON so consumers
//! validate the shape they need themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputsError {
    #[error("Failed to read outputs from {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to write outputs to {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("Outputs file {path} is not a JSON object: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Ordered key → value mapping exported by a stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs(BTreeMap<String, Value>);

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn load(path: &Path) -> Result<Self, OutputsError> {
        let content = fs::read_to_string(path).map_err(|source| OutputsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| OutputsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), OutputsError> {
        let write_err = |source| OutputsError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(path, content).map_err(write_err)
    }
}

impl FromIterator<(String, Value)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
