//! Published enforcer state and observable status
//!
//! [`EnforcerState`] is written only by the reconciliation path and read by
//! the admission gate. [`EnforcerStatus`] is the shape surfaced to operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::alert::Alert;
use crate::ids::EnforcerId;
use crate::usage::UsageSample;

/// Result of the last successful evaluation for one enforcer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerState {
    /// Owning enforcer
    pub enforcer_id: EnforcerId,

    /// Namespace the enforcer targets
    pub target_namespace: String,

    /// Evaluated usage, one entry per sampled resource
    pub usage: Vec<UsageSample>,

    /// Active alerts
    pub alerts: Vec<Alert>,

    /// Whether new workloads are blocked in the target namespace
    pub is_blocking: bool,

    /// When usage was last checked
    pub last_checked_time: DateTime<Utc>,
}

impl EnforcerState {
    /// Names of resources currently over their critical threshold.
    ///
    /// Drawn from both the classified usage and the critical alerts so the
    /// answer does not depend on whether critical alerting is enabled.
    pub fn critical_resources(&self) -> BTreeSet<String> {
        self.usage
            .iter()
            .filter(|u| u.classification.is_critical())
            .map(|u| u.resource_name.clone())
            .chain(
                self.alerts
                    .iter()
                    .filter(|a| a.is_critical())
                    .map(|a| a.resource_name.clone()),
            )
            .collect()
    }
}

/// Kinds of status conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Configuration was rejected
    ConfigInvalid,
    /// The last evaluation attempt failed and is being retried
    EvaluationFailing,
}

/// A condition attached to an enforcer's status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    pub kind: ConditionKind,
    pub message: String,
    pub since: DateTime<Utc>,
}

impl StatusCondition {
    pub fn new(kind: ConditionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            since: Utc::now(),
        }
    }
}

/// Observable status of an enforcer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerStatus {
    /// Current resource usage
    pub current_resource_usage: Vec<UsageSample>,

    /// Last time usage was checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_time: Option<DateTime<Utc>>,

    /// Active alerts
    pub active_alerts: Vec<Alert>,

    /// Whether the enforcer is blocking new workloads
    pub is_blocking: bool,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,

    /// Store version of the published state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_version: Option<u64>,
}

impl EnforcerStatus {
    /// Build a status from the published state, if any
    pub fn from_state(
        state: Option<&EnforcerState>,
        version: Option<u64>,
        conditions: Vec<StatusCondition>,
    ) -> Self {
        match state {
            Some(state) => Self {
                current_resource_usage: state.usage.clone(),
                last_checked_time: Some(state.last_checked_time),
                active_alerts: state.alerts.clone(),
                is_blocking: state.is_blocking,
                conditions,
                observed_version: version,
            },
            None => Self {
                conditions,
                ..Default::default()
            },
        }
    }
}
