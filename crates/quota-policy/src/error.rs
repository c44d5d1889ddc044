//! Error types for admission gating

use quota_state::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Failures while reading state for an admission decision
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GateError {
    /// The state store returned an error
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// The state read did not complete in time
    #[error("State read timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;
