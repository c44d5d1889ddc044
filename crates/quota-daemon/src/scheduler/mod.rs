//! Reconciliation scheduling
//!
//! Enforcer identities flow through a de-duplicating [`WorkQueue`] drained
//! by a fixed pool of workers. An identity is enqueued when its
//! configuration changes, when its check interval elapses and when a failed
//! pass is retried after backoff. The queue guarantees that one identity is
//! never evaluated by two workers at once.

mod backoff;
mod queue;
mod reconciler;

pub use backoff::BackoffPolicy;
pub use queue::WorkQueue;
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler, RetryPolicy};

use futures::future::join_all;
use quota_types::{
    ConditionKind, ConfigError, EnforcerConfig, EnforcerEvent, EnforcerEventEnvelope, EnforcerId,
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::config::SchedulerConfig;
use crate::registry::EnforcerRegistry;

/// Configuration change notification
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// An enforcer was created or updated
    Applied(EnforcerConfig),
    /// An enforcer was deleted
    Deleted(EnforcerId),
}

/// Scheduler state
pub struct Scheduler {
    config: SchedulerConfig,
    registry: Arc<EnforcerRegistry>,
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue<EnforcerId>>,
    backoff: BackoffPolicy,
    event_tx: broadcast::Sender<EnforcerEventEnvelope>,
    running: RwLock<bool>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<EnforcerRegistry>,
        reconciler: Arc<Reconciler>,
        event_tx: broadcast::Sender<EnforcerEventEnvelope>,
    ) -> Arc<Self> {
        let backoff = BackoffPolicy::new(config.backoff.clone());
        Arc::new(Self {
            config,
            registry,
            reconciler,
            queue: Arc::new(WorkQueue::new()),
            backoff,
            event_tx,
            running: RwLock::new(false),
        })
    }

    /// Handle a configuration change.
    ///
    /// Applied configurations are validated first; a rejected one is
    /// recorded as a `ConfigInvalid` condition and the error returned.
    pub async fn apply(&self, event: ConfigEvent) -> Result<(), ConfigError> {
        match event {
            ConfigEvent::Applied(config) => {
                let config = match config.clone().validated() {
                    Ok(config) => config,
                    Err(e) => {
                        self.reject(&config.id, &e);
                        return Err(e);
                    }
                };
                let id = config.id.clone();

                tracing::info!(enforcer = %id, namespace = %config.target_namespace(), "Enforcer configuration applied");
                self.registry.apply(config);
                self.backoff.reset(&id);
                self.queue.forget(&id);
                self.queue.add(id.clone()).await;
                self.emit(EnforcerEvent::ConfigApplied { enforcer_id: id });
            }
            ConfigEvent::Deleted(id) => {
                tracing::info!(enforcer = %id, "Enforcer deleted");
                self.registry.remove(&id);
                self.backoff.reset(&id);
                self.queue.forget(&id);
                self.queue.add(id.clone()).await;
                self.emit(EnforcerEvent::ConfigDeleted { enforcer_id: id });
            }
        }
        Ok(())
    }

    /// Record a configuration that could not be accepted
    pub fn reject(&self, id: &EnforcerId, error: &ConfigError) {
        tracing::warn!(enforcer = %id, error = %error, "Enforcer configuration rejected");
        self.registry.reject(id, error);
        self.emit(EnforcerEvent::ConfigRejected {
            enforcer_id: id.clone(),
            reason: error.to_string(),
        });
    }

    /// Queue an immediate evaluation of `id`
    pub async fn trigger(&self, id: &EnforcerId) {
        self.queue.add(id.clone()).await;
    }

    /// Whether the worker pool is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Start the worker pool and run until [`Scheduler::stop`] is called
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }

        let worker_count = self.config.max_concurrent_reconciliations.max(1);
        tracing::info!(workers = worker_count, "Scheduler started");

        for id in self.registry.ids() {
            self.queue.add(id).await;
        }

        let handles: Vec<_> = (0..worker_count)
            .map(|worker| {
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.run_worker(worker).await })
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Scheduler worker panicked");
                }
            }
        }

        *self.running.write().await = false;
        tracing::info!("Scheduler stopped");
    }

    /// Stop the scheduler. Passes already in progress finish first.
    pub async fn stop(&self) {
        self.queue.shutdown().await;
    }

    async fn run_worker(&self, worker: usize) {
        while let Some(id) = self.queue.get().await {
            self.process(&id).await;
            self.queue.done(&id).await;
        }
        tracing::debug!(worker, "Scheduler worker exiting");
    }

    async fn process(&self, id: &EnforcerId) {
        match self.reconciler.reconcile(id).await {
            Ok(ReconcileOutcome::Published { .. }) => {
                self.backoff.reset(id);
                self.registry
                    .clear_condition(id, ConditionKind::EvaluationFailing);
                self.requeue_after_interval(id);
            }
            Ok(ReconcileOutcome::Removed) => {
                self.backoff.reset(id);
                self.queue.forget(id);
            }
            Ok(ReconcileOutcome::Inactive) => {}
            Err(e) => match e.retry_policy() {
                RetryPolicy::Backoff => {
                    let delay = self.backoff.next_delay(id);
                    tracing::warn!(
                        enforcer = %id,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Reconciliation failed"
                    );
                    self.registry
                        .set_condition(id, ConditionKind::EvaluationFailing, e.to_string());
                    self.emit(EnforcerEvent::EvaluationFailed {
                        enforcer_id: id.clone(),
                        reason: e.to_string(),
                        retry_in_ms: delay.as_millis() as u64,
                    });
                    self.queue.add_after(id.clone(), delay);
                }
                RetryPolicy::Interval => {
                    tracing::info!(enforcer = %id, reason = %e, "Evaluation skipped");
                    self.emit(EnforcerEvent::EvaluationSkipped {
                        enforcer_id: id.clone(),
                        reason: e.to_string(),
                    });
                    self.requeue_after_interval(id);
                }
                RetryPolicy::None => {
                    tracing::error!(enforcer = %id, error = %e, "Reconciliation failed permanently");
                    self.registry
                        .set_condition(id, ConditionKind::EvaluationFailing, e.to_string());
                    self.emit(EnforcerEvent::EvaluationFailed {
                        enforcer_id: id.clone(),
                        reason: e.to_string(),
                        retry_in_ms: 0,
                    });
                }
            },
        }
    }

    fn requeue_after_interval(&self, id: &EnforcerId) {
        if let Some(config) = self.registry.get(id) {
            self.queue.add_after(id.clone(), config.check_interval());
        }
    }

    fn emit(&self, event: EnforcerEvent) {
        let _ = self.event_tx.send(EnforcerEventEnvelope::new(event));
    }
}
