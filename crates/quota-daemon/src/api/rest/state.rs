//! Application state for API handlers

use crate::registry::EnforcerRegistry;
use crate::scheduler::Scheduler;
use quota_policy::AdmissionGate;
use quota_state::StateStore;
use quota_types::{EnforcerEventEnvelope, KindRegistry};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Published enforcer state
    pub store: Arc<dyn StateStore>,

    /// Accepted configurations and conditions
    pub registry: Arc<EnforcerRegistry>,

    /// Scheduler handle
    pub scheduler: Arc<Scheduler>,

    /// Admission gate
    pub gate: Arc<AdmissionGate>,

    /// Known manifest kinds
    pub kinds: Arc<KindRegistry>,

    /// Event broadcast channel
    pub event_tx: broadcast::Sender<EnforcerEventEnvelope>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<EnforcerRegistry>,
        scheduler: Arc<Scheduler>,
        gate: Arc<AdmissionGate>,
        kinds: Arc<KindRegistry>,
        event_tx: broadcast::Sender<EnforcerEventEnvelope>,
    ) -> Self {
        Self {
            store,
            registry,
            scheduler,
            gate,
            kinds,
            event_tx,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
