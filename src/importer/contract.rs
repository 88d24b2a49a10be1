//! Output contract between the ephemeral and registration runs
//!
//! An ephemeral run exports seven string outputs. Registration reads them
//! back through [`OutputContract::from_outputs`], which checks the keys in a
//! fixed order and reports the first one that is missing.

use crate::pipeline::outputs::StackOutputs;
use serde_json::Value;
use thiserror::Error;

pub const OUT_NAME: &str = "name";
pub const OUT_ARCH: &str = "arch";
pub const OUT_OFFER: &str = "offer";
pub const OUT_PUBLISHER: &str = "publisher";
pub const OUT_SKU: &str = "sku";
pub const OUT_STORAGE_ACCOUNT_ID: &str = "saId";
pub const OUT_BLOB_URI: &str = "blobURI";

/// Contract keys in validation order
pub const CONTRACT_KEYS: [&str; 7] = [
    OUT_NAME,
    OUT_ARCH,
    OUT_OFFER,
    OUT_PUBLISHER,
    OUT_SKU,
    OUT_STORAGE_ACCOUNT_ID,
    OUT_BLOB_URI,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("output not found: {0}")]
    MissingOutput(String),

    #[error("output {key} must be a string, found {found}")]
    TypeMismatch { key: String, found: String },
}

/// The seven values an ephemeral run hands to registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputContract {
    pub name: String,
    pub arch: String,
    pub offer: String,
    pub publisher: String,
    pub sku: String,
    pub storage_account_id: String,
    pub blob_uri: String,
}

impl OutputContract {
    pub fn from_outputs(outputs: &StackOutputs) -> Result<Self, ContractError> {
        // Field initializers run in order, matching CONTRACT_KEYS
        Ok(Self {
            name: required_string(outputs, OUT_NAME)?,
            arch: required_string(outputs, OUT_ARCH)?,
            offer: required_string(outputs, OUT_OFFER)?,
            publisher: required_string(outputs, OUT_PUBLISHER)?,
            sku: required_string(outputs, OUT_SKU)?,
            storage_account_id: required_string(outputs, OUT_STORAGE_ACCOUNT_ID)?,
            blob_uri: required_string(outputs, OUT_BLOB_URI)?,
        })
    }

    pub fn to_outputs(&self) -> StackOutputs {
        let mut outputs = StackOutputs::new();
        outputs.insert(OUT_NAME, self.name.as_str());
        outputs.insert(OUT_ARCH, self.arch.as_str());
        outputs.insert(OUT_OFFER, self.offer.as_str());
        outputs.insert(OUT_PUBLISHER, self.publisher.as_str());
        outputs.insert(OUT_SKU, self.sku.as_str());
        outputs.insert(OUT_STORAGE_ACCOUNT_ID, self.storage_account_id.as_str());
        outputs.insert(OUT_BLOB_URI, self.blob_uri.as_str());
        outputs
    }
}

fn required_string(outputs: &StackOutputs, key: &str) -> Result<String, ContractError> {
    match outputs.get(key) {
        None => Err(ContractError::MissingOutput(key.to_string())),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(ContractError::TypeMismatch {
            key: key.to_string(),
            found: json_type(other).to_string(),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Everything needed to publish an uploaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    contract: OutputContract,
    replicate: bool,
    org_tenant_id: Option<String>,
}

impl RegisterRequest {
    /// An empty or blank tenant id means no sharing
    pub fn new(contract: OutputContract, replicate: bool, org_tenant_id: Option<String>) -> Self {
        Self {
            contract,
            replicate,
            org_tenant_id: org_tenant_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn from_outputs(
        outputs: &StackOutputs,
        replicate: bool,
        org_tenant_id: Option<String>,
    ) -> Result<Self, ContractError> {
        Ok(Self::new(
            OutputContract::from_outputs(outputs)?,
            replicate,
            org_tenant_id,
        ))
    }

    pub fn contract(&self) -> &OutputContract {
        &self.contract
    }

    pub fn name(&self) -> &str {
        &self.contract.name
    }

    pub fn arch(&self) -> &str {
        &self.contract.arch
    }

    pub fn replicate(&self) -> bool {
        self.replicate
    }

    pub fn org_tenant_id(&self) -> Option<&str> {
        self.org_tenant_id.as_deref()
    }
}
