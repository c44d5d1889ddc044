//! Configuration errors
//!
//! Raised when an enforcer manifest or configuration cannot be accepted.
//! These never stop the process; the reconciler surfaces them as a status
//! condition on the enforcer.

use thiserror::Error;

/// Errors raised while decoding or validating enforcer configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Identity string is not `namespace/name`
    #[error("invalid enforcer identity: {0}")]
    InvalidIdentity(String),

    /// Manifest kind is not registered
    #[error("unknown configuration kind {kind} ({api_version})")]
    UnknownKind { api_version: String, kind: String },

    /// Manifest could not be decoded
    #[error("malformed manifest: {0}")]
    Malformed(String),

    /// A required field is missing or empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The same resource appears in more than one threshold
    #[error("duplicate threshold for resource {0}")]
    DuplicateResource(String),

    /// Warning threshold is above the critical threshold
    #[error(
        "warning threshold {warning}% exceeds critical threshold {critical}% for resource {resource}"
    )]
    InvertedThresholds {
        resource: String,
        warning: u32,
        critical: u32,
    },

    /// Resource quantity string could not be parsed
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}
