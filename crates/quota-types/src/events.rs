//! Event types for enforcer observability
//!
//! Events provide a unified stream of reconciliation and admission outcomes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::AlertSeverity;
use crate::ids::EnforcerId;

/// Envelope wrapping all enforcer events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcerEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: EnforcerEvent,
}

impl EnforcerEventEnvelope {
    pub fn new(event: EnforcerEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity: event.default_severity(),
            event,
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event
    Debug,
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

/// Enforcer events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnforcerEvent {
    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// Configuration created or updated
    ConfigApplied { enforcer_id: EnforcerId },

    /// Configuration deleted, state removed
    ConfigDeleted { enforcer_id: EnforcerId },

    /// Configuration rejected
    ConfigRejected {
        enforcer_id: EnforcerId,
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // EVALUATION EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// Evaluation published a new state
    EvaluationCompleted {
        enforcer_id: EnforcerId,
        is_blocking: bool,
        alert_count: usize,
    },

    /// Evaluation skipped, previous state kept
    EvaluationSkipped {
        enforcer_id: EnforcerId,
        reason: String,
    },

    /// Evaluation failed and will be retried
    EvaluationFailed {
        enforcer_id: EnforcerId,
        reason: String,
        retry_in_ms: u64,
    },

    /// Blocking flag flipped
    BlockingChanged {
        enforcer_id: EnforcerId,
        namespace: String,
        is_blocking: bool,
    },

    /// A new alert was raised
    AlertRaised {
        enforcer_id: EnforcerId,
        resource_name: String,
        severity: AlertSeverity,
    },

    // ═══════════════════════════════════════════════════════════════════
    // ADMISSION EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// A creation request was denied
    AdmissionDenied {
        namespace: String,
        resources: Vec<String>,
    },
}

impl EnforcerEvent {
    fn default_severity(&self) -> EventSeverity {
        match self {
            EnforcerEvent::ConfigApplied { .. }
            | EnforcerEvent::ConfigDeleted { .. }
            | EnforcerEvent::EvaluationCompleted { .. } => EventSeverity::Info,
            EnforcerEvent::EvaluationSkipped { .. } => EventSeverity::Debug,
            EnforcerEvent::ConfigRejected { .. } | EnforcerEvent::EvaluationFailed { .. } => {
                EventSeverity::Error
            }
            EnforcerEvent::BlockingChanged { is_blocking, .. } => {
                if *is_blocking {
                    EventSeverity::Warning
                } else {
                    EventSeverity::Info
                }
            }
            EnforcerEvent::AlertRaised { .. } | EnforcerEvent::AdmissionDenied { .. } => {
                EventSeverity::Warning
            }
        }
    }

    /// Enforcer the event concerns, if any
    pub fn enforcer_id(&self) -> Option<&EnforcerId> {
        match self {
            EnforcerEvent::ConfigApplied { enforcer_id }
            | EnforcerEvent::ConfigDeleted { enforcer_id }
            | EnforcerEvent::ConfigRejected { enforcer_id, .. }
            | EnforcerEvent::EvaluationCompleted { enforcer_id, .. }
            | EnforcerEvent::EvaluationSkipped { enforcer_id, .. }
            | EnforcerEvent::EvaluationFailed { enforcer_id, .. }
            | EnforcerEvent::BlockingChanged { enforcer_id, .. }
            | EnforcerEvent::AlertRaised { enforcer_id, .. } => Some(enforcer_id),
            EnforcerEvent::AdmissionDenied { .. } => None,
        }
    }
}
