//! Admission decision types
//!
//! A decision is the outcome of one gate evaluation. Store failures are a
//! distinct outcome so callers can tell "allowed" apart from "could not
//! decide".

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Operation named by an admission request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdmissionOperation {
    Create,
    Update,
    Delete,
    Connect,
    /// Anything else; never evaluated
    Other(String),
}

impl AdmissionOperation {
    /// Only creation is subject to quota blocking
    pub fn is_gated(&self) -> bool {
        matches!(self, AdmissionOperation::Create)
    }
}

impl From<&str> for AdmissionOperation {
    fn from(s: &str) -> Self {
        match s {
            "CREATE" => AdmissionOperation::Create,
            "UPDATE" => AdmissionOperation::Update,
            "DELETE" => AdmissionOperation::Delete,
            "CONNECT" => AdmissionOperation::Connect,
            _ => AdmissionOperation::Other(s.to_string()),
        }
    }
}

impl FromStr for AdmissionOperation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AdmissionOperation::from(s))
    }
}

impl fmt::Display for AdmissionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionOperation::Create => write!(f, "CREATE"),
            AdmissionOperation::Update => write!(f, "UPDATE"),
            AdmissionOperation::Delete => write!(f, "DELETE"),
            AdmissionOperation::Connect => write!(f, "CONNECT"),
            AdmissionOperation::Other(op) => write!(f, "{}", op),
        }
    }
}

/// What to do when the gate cannot read state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request
    FailOpen,
    /// Reject the request
    #[default]
    FailClosed,
}

/// Admission decision
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Request is admitted
    Allow,

    /// Request is rejected
    Deny {
        /// Names the namespace and the critical resources
        reason: String,
        /// Critical resources of the blocking enforcers, sorted
        resources: Vec<String>,
    },

    /// State could not be read
    Unavailable {
        /// What went wrong
        error: String,
        /// Policy that decides the final answer
        fallback: FailurePolicy,
    },
}

impl AdmissionDecision {
    pub fn deny(reason: impl Into<String>, resources: Vec<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
            resources,
        }
    }

    /// Whether the request should be admitted
    pub fn is_allowed(&self) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny { .. } => false,
            Self::Unavailable { fallback, .. } => *fallback == FailurePolicy::FailOpen,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Human-readable reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason, .. } => Some(reason),
            Self::Unavailable { error, .. } => Some(error),
        }
    }

    /// Short label used on the wire and in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny { .. } => "deny",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parsing() {
        assert_eq!("CREATE".parse::<AdmissionOperation>().unwrap(), AdmissionOperation::Create);
        // Operation names are matched exactly, as admission requests spell them
        let lower = "create".parse::<AdmissionOperation>().unwrap();
        assert_eq!(lower, AdmissionOperation::Other("create".into()));
        assert!(!lower.is_gated());
        assert_eq!(AdmissionOperation::from("DELETE"), AdmissionOperation::Delete);
        assert_eq!(
            "PATCH".parse::<AdmissionOperation>().unwrap(),
            AdmissionOperation::Other("PATCH".into())
        );
        assert!(AdmissionOperation::Create.is_gated());
        assert!(!AdmissionOperation::Update.is_gated());
    }

    #[test]
    fn test_unavailable_follows_failure_policy() {
        let open = AdmissionDecision::Unavailable {
            error: "down".into(),
            fallback: FailurePolicy::FailOpen,
        };
        let closed = AdmissionDecision::Unavailable {
            error: "down".into(),
            fallback: FailurePolicy::FailClosed,
        };
        assert!(open.is_allowed());
        assert!(!closed.is_allowed());
        assert!(!closed.is_denied());
        assert_eq!(closed.label(), "unavailable");
    }

    #[test]
    fn test_failure_policy_wire_format() {
        let parsed: FailurePolicy = serde_json::from_str("\"fail_open\"").unwrap();
        assert_eq!(parsed, FailurePolicy::FailOpen);
        assert_eq!(FailurePolicy::default(), FailurePolicy::FailClosed);
    }
}
