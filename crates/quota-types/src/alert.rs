//! Alert types
//!
//! Alerts are a snapshot: the evaluator regenerates the whole list every
//! cycle and a resource that drops back to normal loses its alert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// An active alert for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Resource that triggered the alert
    pub resource_name: String,

    /// Warning or critical
    pub severity: AlertSeverity,

    /// Human-readable message
    pub message: String,

    /// When the alert was first raised
    pub time_triggered: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        resource_name: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        time_triggered: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            severity,
            message: message.into(),
            time_triggered,
        }
    }

    /// Two alerts describe the same condition when resource and severity match
    pub fn same_condition(&self, other: &Alert) -> bool {
        self.resource_name == other.resource_name && self.severity == other.severity
    }

    pub fn is_critical(&self) -> bool {
        self.severity == AlertSeverity::Critical
    }
}
