//! Threshold evaluation
//!
//! Maps a configuration and the latest usage samples to classifications,
//! alerts and a blocking flag. Thresholds are visited in configured order so
//! the output order is stable for identical input.

use chrono::{DateTime, Utc};
use quota_types::{
    Alert, AlertSeverity, Classification, EnforcerConfig, EnforcerState, ResourceUsage,
    UsageSample,
};

/// Output of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// One entry per configured resource that had a sample
    pub usage: Vec<UsageSample>,

    /// Alerts raised by this evaluation
    pub alerts: Vec<Alert>,

    /// Whether new workloads should be blocked
    pub is_blocking: bool,

    /// Evaluation time
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    /// Copy `time_triggered` from alerts that were already active.
    pub fn carry_forward(mut self, previous: Option<&EnforcerState>) -> Self {
        if let Some(previous) = previous {
            for alert in &mut self.alerts {
                if let Some(old) = previous.alerts.iter().find(|a| a.same_condition(alert)) {
                    alert.time_triggered = old.time_triggered;
                }
            }
        }
        self
    }

    /// Alerts that were not active in `previous`
    pub fn new_alerts(&self, previous: Option<&EnforcerState>) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|alert| {
                previous.map_or(true, |p| !p.alerts.iter().any(|a| a.same_condition(alert)))
            })
            .cloned()
            .collect()
    }

    /// Publishable state for `config`
    pub fn into_state(self, config: &EnforcerConfig) -> EnforcerState {
        EnforcerState {
            enforcer_id: config.id.clone(),
            target_namespace: config.target_namespace().to_string(),
            usage: self.usage,
            alerts: self.alerts,
            is_blocking: self.is_blocking,
            last_checked_time: self.evaluated_at,
        }
    }
}

/// Stateless threshold evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `samples` against `config`.
    ///
    /// Resources without a sample are treated as normal and produce neither
    /// a usage entry nor an alert. Samples for resources the configuration
    /// does not mention are ignored.
    pub fn evaluate(
        &self,
        config: &EnforcerConfig,
        samples: &[ResourceUsage],
        now: DateTime<Utc>,
    ) -> EvaluationResult {
        let actions = config.actions();
        let mut usage = Vec::with_capacity(config.thresholds().len());
        let mut alerts = Vec::new();
        let mut any_critical = false;

        for threshold in config.thresholds() {
            let Some(sample) = samples
                .iter()
                .find(|s| s.resource_name == threshold.resource_name)
            else {
                continue;
            };

            let (warning, critical) = threshold.clamped();
            let used = sample.used_percent();
            let classification = Classification::classify(used, warning, critical);

            match classification {
                Classification::Critical => {
                    any_critical = true;
                    if actions.send_critical_alert {
                        alerts.push(Alert::new(
                            &threshold.resource_name,
                            AlertSeverity::Critical,
                            format!(
                                "Resource {} usage at {}% exceeds critical threshold of {}%",
                                threshold.resource_name, used, critical
                            ),
                            now,
                        ));
                    }
                }
                Classification::Warning => {
                    if actions.send_warning_alert {
                        alerts.push(Alert::new(
                            &threshold.resource_name,
                            AlertSeverity::Warning,
                            format!(
                                "Resource {} usage at {}% exceeds warning threshold of {}%",
                                threshold.resource_name, used, warning
                            ),
                            now,
                        ));
                    }
                }
                Classification::Normal => {}
            }

            usage.push(UsageSample {
                resource_name: threshold.resource_name.clone(),
                used_percentage: used,
                current_value: sample.current.clone(),
                limit_value: sample.limit.clone(),
                classification,
            });
        }

        EvaluationResult {
            usage,
            alerts,
            is_blocking: actions.block_new_deployments && any_critical,
            evaluated_at: now,
        }
    }
}
