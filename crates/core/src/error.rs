use crate::types::SlotId;
use thiserror::Error;

pub type RotationResult<T> = Result<T, RotationError>;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("slot {0} does not exist")]
    SlotNotFound(SlotId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Event publishing error: {0}")]
    Events(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RotationError {
    /// True for conditions caused by the request rather than the service.
    /// The HTTP layer maps these to a bad-request class response.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RotationError::SlotNotFound(_) | RotationError::Validation(_)
        )
    }
}
