use super::contract::ContractError;
use crate::azure::error::AzureError;
use crate::pipeline::error::EngineError;
use crate::pipeline::outputs::OutputsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Azure(#[from] AzureError),

    #[error(transparent)]
    Outputs(#[from] OutputsError),

    #[error("Failed to describe bundle {uri}: {message}")]
    BundleDescription { uri: String, message: String },
}
