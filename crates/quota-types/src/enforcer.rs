//! Enforcer configuration
//!
//! An [`EnforcerConfig`] binds a target namespace to per-resource
//! thresholds and the actions to take when they are crossed. The core
//! treats it as read-only input; operators create and update it through
//! the configuration surface.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::ids::EnforcerId;

/// Lowest accepted threshold percentage
pub const MIN_PERCENT: u32 = 1;

/// Highest accepted threshold percentage
pub const MAX_PERCENT: u32 = 100;

/// Thresholds for a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceThreshold {
    /// Resource to monitor (cpu, memory, pods, ...)
    pub resource_name: String,

    /// Usage percentage that raises a warning
    #[serde(default = "default_warning_percent")]
    pub warning_threshold_percent: u32,

    /// Usage percentage that raises a critical alert
    #[serde(default = "default_critical_percent")]
    pub critical_threshold_percent: u32,
}

impl ResourceThreshold {
    pub fn new(resource_name: impl Into<String>, warning: u32, critical: u32) -> Self {
        Self {
            resource_name: resource_name.into(),
            warning_threshold_percent: warning,
            critical_threshold_percent: critical,
        }
    }

    /// Warning and critical percentages clamped to `[1, 100]`
    pub fn clamped(&self) -> (u32, u32) {
        (
            self.warning_threshold_percent.clamp(MIN_PERCENT, MAX_PERCENT),
            self.critical_threshold_percent.clamp(MIN_PERCENT, MAX_PERCENT),
        )
    }
}

/// What to do when thresholds are reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementActions {
    /// Send an alert when a warning threshold is reached
    #[serde(default = "default_true")]
    pub send_warning_alert: bool,

    /// Where warning alerts go (webhook URL); empty means log only
    #[serde(default)]
    pub warning_alert_channel: String,

    /// Send an alert when a critical threshold is reached
    #[serde(default = "default_true")]
    pub send_critical_alert: bool,

    /// Where critical alerts go (webhook URL); empty means log only
    #[serde(default)]
    pub critical_alert_channel: String,

    /// Block new workload creation while any resource is critical
    #[serde(default)]
    pub block_new_deployments: bool,
}

impl Default for EnforcementActions {
    fn default() -> Self {
        Self {
            send_warning_alert: true,
            warning_alert_channel: String::new(),
            send_critical_alert: true,
            critical_alert_channel: String::new(),
            block_new_deployments: false,
        }
    }
}

/// Desired behaviour of an enforcer, as written by an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerSpec {
    /// Namespace to monitor and enforce
    pub target_namespace: String,

    /// Per-resource thresholds, in evaluation order
    pub resource_thresholds: Vec<ResourceThreshold>,

    /// Actions to take when thresholds are reached
    #[serde(default)]
    pub actions: EnforcementActions,

    /// Seconds between usage checks
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
}

/// A named enforcer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Enforcer identity
    pub id: EnforcerId,

    /// Desired behaviour
    pub spec: EnforcerSpec,
}

impl EnforcerConfig {
    pub fn new(id: EnforcerId, target_namespace: impl Into<String>) -> Self {
        Self {
            id,
            spec: EnforcerSpec {
                target_namespace: target_namespace.into(),
                resource_thresholds: Vec::new(),
                actions: EnforcementActions::default(),
                check_interval_seconds: default_check_interval(),
            },
        }
    }

    /// Add a resource threshold
    pub fn with_threshold(mut self, threshold: ResourceThreshold) -> Self {
        self.spec.resource_thresholds.push(threshold);
        self
    }

    /// Set the enforcement actions
    pub fn with_actions(mut self, actions: EnforcementActions) -> Self {
        self.spec.actions = actions;
        self
    }

    /// Set the check interval
    pub fn with_check_interval(mut self, seconds: u64) -> Self {
        self.spec.check_interval_seconds = seconds;
        self
    }

    pub fn target_namespace(&self) -> &str {
        &self.spec.target_namespace
    }

    pub fn thresholds(&self) -> &[ResourceThreshold] {
        &self.spec.resource_thresholds
    }

    pub fn actions(&self) -> &EnforcementActions {
        &self.spec.actions
    }

    /// Names of all monitored resources, in configured order
    pub fn resource_names(&self) -> Vec<String> {
        self.spec
            .resource_thresholds
            .iter()
            .map(|t| t.resource_name.clone())
            .collect()
    }

    /// Interval between checks, never shorter than one second
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.spec.check_interval_seconds.max(1))
    }

    /// Validate and normalise the configuration.
    ///
    /// Percentages are clamped to `[1, 100]` and the interval to at least
    /// one second. Inverted thresholds (warning above critical) are rejected.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.spec.target_namespace.trim().is_empty() {
            return Err(ConfigError::MissingField("targetNamespace"));
        }
        if self.spec.resource_thresholds.is_empty() {
            return Err(ConfigError::MissingField("resourceThresholds"));
        }

        let mut seen = HashSet::new();
        for threshold in &mut self.spec.resource_thresholds {
            if threshold.resource_name.trim().is_empty() {
                return Err(ConfigError::MissingField("resourceThresholds[].resourceName"));
            }
            if !seen.insert(threshold.resource_name.clone()) {
                return Err(ConfigError::DuplicateResource(
                    threshold.resource_name.clone(),
                ));
            }

            let (warning, critical) = threshold.clamped();
            if warning > critical {
                return Err(ConfigError::InvertedThresholds {
                    resource: threshold.resource_name.clone(),
                    warning,
                    critical,
                });
            }
            threshold.warning_threshold_percent = warning;
            threshold.critical_threshold_percent = critical;
        }

        self.spec.check_interval_seconds = self.spec.check_interval_seconds.max(1);
        Ok(self)
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_warning_percent() -> u32 {
    80
}

fn default_critical_percent() -> u32 {
    90
}

fn default_check_interval() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EnforcerConfig {
        EnforcerConfig::new(EnforcerId::new("ops", "quota"), "team-a")
            .with_threshold(ResourceThreshold::new("cpu", 80, 90))
    }

    #[test]
    fn test_spec_defaults() {
        let spec: EnforcerSpec = serde_json::from_value(serde_json::json!({
            "targetNamespace": "team-a",
            "resourceThresholds": [{ "resourceName": "cpu" }]
        }))
        .unwrap();

        assert_eq!(spec.check_interval_seconds, 60);
        assert_eq!(spec.resource_thresholds[0].warning_threshold_percent, 80);
        assert_eq!(spec.resource_thresholds[0].critical_threshold_percent, 90);
        assert!(spec.actions.send_warning_alert);
        assert!(spec.actions.send_critical_alert);
        assert!(!spec.actions.block_new_deployments);
    }

    #[test]
    fn test_validation_clamps() {
        let config = EnforcerConfig::new(EnforcerId::new("ops", "quota"), "team-a")
            .with_threshold(ResourceThreshold::new("cpu", 0, 250))
            .with_check_interval(0)
            .validated()
            .unwrap();

        let threshold = &config.thresholds()[0];
        assert_eq!(threshold.warning_threshold_percent, 1);
        assert_eq!(threshold.critical_threshold_percent, 100);
        assert_eq!(config.check_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let err = EnforcerConfig::new(EnforcerId::new("ops", "quota"), "team-a")
            .with_threshold(ResourceThreshold::new("memory", 95, 90))
            .validated()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedThresholds { warning: 95, critical: 90, .. }));
    }

    #[test]
    fn test_validation_rejects_duplicates_and_empty() {
        let err = config()
            .with_threshold(ResourceThreshold::new("cpu", 50, 60))
            .validated()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateResource("cpu".into()));

        let err = EnforcerConfig::new(EnforcerId::new("ops", "quota"), "team-a")
            .validated()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField("resourceThresholds"));

        let err = EnforcerConfig::new(EnforcerId::new("ops", "quota"), " ")
            .with_threshold(ResourceThreshold::new("cpu", 80, 90))
            .validated()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField("targetNamespace"));
    }

    #[test]
    fn test_equal_thresholds_are_accepted() {
        let config = EnforcerConfig::new(EnforcerId::new("ops", "quota"), "team-a")
            .with_threshold(ResourceThreshold::new("pods", 90, 90))
            .validated();
        assert!(config.is_ok());
        assert_eq!(config.unwrap().resource_names(), vec!["pods".to_string()]);
    }
}
