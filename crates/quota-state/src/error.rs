//! Error types for quota-state crate.

use quota_types::EnforcerId;
use thiserror::Error;

/// Errors raised by state storage backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Conditional write lost against a concurrent update.
    #[error("version conflict for {enforcer_id}: expected {expected:?}, found {actual:?}")]
    Conflict {
        enforcer_id: EnforcerId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// Backend could not be reached or the call timed out.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// The record handed to the store is inconsistent.
    #[error("invalid state: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Whether the failure is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Unavailable(_))
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
