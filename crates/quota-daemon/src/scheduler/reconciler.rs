//! One reconciliation pass for a single enforcer
//!
//! sample → evaluate → conditional publish. Every external call carries a
//! timeout; a timeout is reported like any other transient failure.

use chrono::Utc;
use quota_policy::ThresholdEvaluator;
use quota_state::{StateStore, StoreError, Version};
use quota_types::{
    Alert, EnforcerConfig, EnforcerEvent, EnforcerEventEnvelope, EnforcerId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::notify::{AlertNotification, AlertNotifier};
use crate::registry::EnforcerRegistry;
use crate::sampler::{SampleError, UsageSampler};

/// Failures of a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Usage could not be sampled
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// State could not be read or written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An external call did not finish in time
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        stage: &'static str,
        after: Duration,
    },
}

/// How the scheduler follows up on a failed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry after an exponential backoff delay
    Backoff,
    /// Try again at the regular check interval
    Interval,
    /// Do not retry until something changes
    None,
}

impl ReconcileError {
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ReconcileError::Sample(SampleError::NotFound(_)) => RetryPolicy::Interval,
            ReconcileError::Sample(SampleError::Transient(_)) => RetryPolicy::Backoff,
            ReconcileError::Store(e) if e.is_retryable() => RetryPolicy::Backoff,
            ReconcileError::Store(_) => RetryPolicy::None,
            ReconcileError::Timeout { .. } => RetryPolicy::Backoff,
        }
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new state was published
    Published { version: Version, is_blocking: bool },
    /// The enforcer is gone and its state was removed
    Removed,
    /// The enforcer has no accepted configuration; nothing to do
    Inactive,
}

/// Evaluates one enforcer and publishes its state
pub struct Reconciler {
    registry: Arc<EnforcerRegistry>,
    store: Arc<dyn StateStore>,
    sampler: Arc<dyn UsageSampler>,
    notifier: Arc<dyn AlertNotifier>,
    evaluator: ThresholdEvaluator,
    event_tx: broadcast::Sender<EnforcerEventEnvelope>,
    sample_timeout: Duration,
    store_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        registry: Arc<EnforcerRegistry>,
        store: Arc<dyn StateStore>,
        sampler: Arc<dyn UsageSampler>,
        notifier: Arc<dyn AlertNotifier>,
        event_tx: broadcast::Sender<EnforcerEventEnvelope>,
    ) -> Self {
        Self {
            registry,
            store,
            sampler,
            notifier,
            evaluator: ThresholdEvaluator::new(),
            event_tx,
            sample_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(2),
        }
    }

    /// Set the sampler and store call timeouts
    pub fn with_timeouts(mut self, sample_timeout: Duration, store_timeout: Duration) -> Self {
        self.sample_timeout = sample_timeout;
        self.store_timeout = store_timeout;
        self
    }

    /// Run one pass for `id`.
    ///
    /// On any error the previously published state is left untouched.
    #[instrument(skip(self, id), fields(enforcer = %id))]
    pub async fn reconcile(&self, id: &EnforcerId) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(config) = self.registry.get(id) else {
            if self.registry.contains(id) {
                return Ok(ReconcileOutcome::Inactive);
            }
            return self.remove_state(id).await;
        };

        let previous = self.store_call("state read", self.store.get(id)).await?;
        let previous_state = previous.as_ref().map(|v| &v.value);

        let samples = match tokio::time::timeout(
            self.sample_timeout,
            self.sampler
                .sample(config.target_namespace(), &config.resource_names()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ReconcileError::Timeout {
                    stage: "usage sample",
                    after: self.sample_timeout,
                })
            }
        };

        let result = self.evaluator.evaluate(&config, &samples, Utc::now());
        let fresh = result.new_alerts(previous_state);
        let state = result.carry_forward(previous_state).into_state(&config);

        let is_blocking = state.is_blocking;
        let alert_count = state.alerts.len();
        let was_blocking = previous_state.map(|s| s.is_blocking).unwrap_or(false);

        let version = self
            .store_call(
                "state write",
                self.store.put(id, state, previous.as_ref().map(|v| v.version)),
            )
            .await?;

        tracing::debug!(version, is_blocking, alert_count, "Published enforcer state");

        if was_blocking != is_blocking {
            tracing::info!(
                namespace = %config.target_namespace(),
                is_blocking,
                "Blocking state changed"
            );
            self.emit(EnforcerEvent::BlockingChanged {
                enforcer_id: id.clone(),
                namespace: config.target_namespace().to_string(),
                is_blocking,
            });
        }
        for alert in &fresh {
            self.emit(EnforcerEvent::AlertRaised {
                enforcer_id: id.clone(),
                resource_name: alert.resource_name.clone(),
                severity: alert.severity,
            });
        }
        self.emit(EnforcerEvent::EvaluationCompleted {
            enforcer_id: id.clone(),
            is_blocking,
            alert_count,
        });

        self.deliver(&config, fresh);

        Ok(ReconcileOutcome::Published {
            version,
            is_blocking,
        })
    }

    async fn remove_state(&self, id: &EnforcerId) -> Result<ReconcileOutcome, ReconcileError> {
        let previous = self.store_call("state read", self.store.get(id)).await?;
        let existed = self.store_call("state delete", self.store.delete(id)).await?;

        if existed {
            tracing::info!("Removed state of deleted enforcer");
        }
        if let Some(previous) = previous.filter(|p| p.value.is_blocking) {
            self.emit(EnforcerEvent::BlockingChanged {
                enforcer_id: id.clone(),
                namespace: previous.value.target_namespace,
                is_blocking: false,
            });
        }
        Ok(ReconcileOutcome::Removed)
    }

    /// Hand new alerts to the notifier without waiting for delivery
    fn deliver(&self, config: &EnforcerConfig, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }

        let notifications: Vec<_> = alerts
            .iter()
            .map(|a| AlertNotification::new(&config.id, config.target_namespace(), a))
            .collect();
        let actions = config.actions().clone();
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            for notification in notifications {
                let channel = notification.channel(&actions);
                if let Err(e) = notifier.notify(channel, &notification).await {
                    tracing::warn!(
                        enforcer = %notification.enforcer,
                        resource = %notification.resource_name,
                        error = %e,
                        "Alert delivery failed"
                    );
                }
            }
        });
    }

    async fn store_call<T>(
        &self,
        stage: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ReconcileError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ReconcileError::Timeout {
                stage,
                after: self.store_timeout,
            }),
        }
    }

    fn emit(&self, event: EnforcerEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(EnforcerEventEnvelope::new(event));
    }
}
