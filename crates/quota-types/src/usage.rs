//! Usage samples and classification
//!
//! A [`ResourceUsage`] is what the usage-reporting service returns for one
//! resource. The evaluator turns it into a [`UsageSample`] carrying the
//! derived percentage and the [`Classification`] it assigned.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quantity::Quantity;

/// Raw usage reported for one resource in a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    /// Resource name (cpu, memory, pods, ...)
    pub resource_name: String,

    /// Current consumption
    pub current: Quantity,

    /// Quota limit
    pub limit: Quantity,
}

impl ResourceUsage {
    pub fn new(resource_name: impl Into<String>, current: Quantity, limit: Quantity) -> Self {
        Self {
            resource_name: resource_name.into(),
            current,
            limit,
        }
    }

    /// Rounded percentage of the limit in use; 0 when the limit is not positive
    pub fn used_percent(&self) -> u32 {
        self.current.percent_of(&self.limit).unwrap_or(0)
    }

    /// Whether the limit admits a meaningful percentage
    pub fn has_limit(&self) -> bool {
        self.limit.value() > 0.0
    }
}

/// Severity bucket for a resource relative to its thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Normal,
    Warning,
    Critical,
}

impl Classification {
    /// Classify a usage percentage against warning and critical boundaries.
    ///
    /// Critical is checked first, so the result is well-defined even when
    /// `warning > critical`.
    pub fn classify(used_percent: u32, warning_percent: u32, critical_percent: u32) -> Self {
        if used_percent >= critical_percent {
            Classification::Critical
        } else if used_percent >= warning_percent {
            Classification::Warning
        } else {
            Classification::Normal
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Classification::Critical)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Normal => write!(f, "NORMAL"),
            Classification::Warning => write!(f, "WARNING"),
            Classification::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Evaluated usage of one resource, as published in enforcer state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSample {
    /// Resource name
    pub resource_name: String,

    /// Percentage of the limit in use
    pub used_percentage: u32,

    /// Current usage value
    pub current_value: Quantity,

    /// Quota limit value
    pub limit_value: Quantity,

    /// Classification assigned by the evaluator
    pub classification: Classification,
}
