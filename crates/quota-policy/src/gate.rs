//! Admission gate
//!
//! Each decision performs exactly one snapshot read of the states
//! targeting the namespace, bounded by a read timeout.

use quota_state::StateStore;
use quota_types::EnforcerState;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::decision::{AdmissionDecision, AdmissionOperation, FailurePolicy};
use crate::error::{GateError, Result};

/// Gate configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Upper bound on the state read
    pub read_timeout: Duration,

    /// Answer used when state cannot be read
    pub failure_policy: FailurePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            failure_policy: FailurePolicy::FailClosed,
        }
    }
}

/// Admission gate over published enforcer state
pub struct AdmissionGate {
    store: Arc<dyn StateStore>,
    config: GateConfig,
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AdmissionGate {
    pub fn new(store: Arc<dyn StateStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide whether `operation` may proceed in `namespace`.
    #[instrument(skip(self, operation), fields(operation = %operation))]
    pub async fn decide(&self, namespace: &str, operation: &AdmissionOperation) -> AdmissionDecision {
        if !operation.is_gated() {
            return AdmissionDecision::Allow;
        }

        let states = match self.snapshot(namespace).await {
            Ok(states) => states,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    policy = ?self.config.failure_policy,
                    "Admission decision unavailable"
                );
                return AdmissionDecision::Unavailable {
                    error: e.to_string(),
                    fallback: self.config.failure_policy,
                };
            }
        };

        let resources = blocking_resources(&states);
        if states.iter().any(|s| s.is_blocking) {
            let reason = denial_reason(namespace, &resources);
            tracing::info!(resources = ?resources, "Denying workload creation");
            AdmissionDecision::deny(reason, resources.into_iter().collect())
        } else {
            AdmissionDecision::Allow
        }
    }

    /// Critical resources blocking `namespace`, empty when nothing blocks
    pub async fn blocking_resources(&self, namespace: &str) -> Result<Vec<String>> {
        let states = self.snapshot(namespace).await?;
        Ok(blocking_resources(&states).into_iter().collect())
    }

    async fn snapshot(&self, namespace: &str) -> Result<Vec<EnforcerState>> {
        match tokio::time::timeout(
            self.config.read_timeout,
            self.store.get_all_targeting(namespace),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(GateError::Timeout(self.config.read_timeout)),
        }
    }
}

fn blocking_resources(states: &[EnforcerState]) -> BTreeSet<String> {
    states
        .iter()
        .filter(|s| s.is_blocking)
        .flat_map(|s| s.critical_resources())
        .collect()
}

fn denial_reason(namespace: &str, resources: &BTreeSet<String>) -> String {
    let names: Vec<&str> = resources.iter().map(String::as_str).collect();
    format!(
        "Resource creation blocked: namespace {} has reached resource quota critical threshold for: [{}]",
        namespace,
        names.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use quota_state::{InMemoryStateStore, StoreError, StoreResult, Version, Versioned};
    use quota_types::{
        Alert, AlertSeverity, Classification, EnforcerId, Quantity, UsageSample,
    };

    fn sample(name: &str, classification: Classification) -> UsageSample {
        UsageSample {
            resource_name: name.into(),
            used_percentage: 95,
            current_value: Quantity::from_value(95.0),
            limit_value: Quantity::from_value(100.0),
            classification,
        }
    }

    fn state(name: &str, namespace: &str, blocking: bool, critical: &[&str]) -> EnforcerState {
        EnforcerState {
            enforcer_id: EnforcerId::new("ops", name),
            target_namespace: namespace.into(),
            usage: critical.iter().map(|r| sample(r, Classification::Critical)).collect(),
            alerts: critical
                .iter()
                .map(|r| Alert::new(*r, AlertSeverity::Critical, "over", Utc::now()))
                .collect(),
            is_blocking: blocking,
            last_checked_time: Utc::now(),
        }
    }

    async fn gate_with(states: Vec<EnforcerState>) -> AdmissionGate {
        let store = Arc::new(InMemoryStateStore::new());
        for s in states {
            let id = s.enforcer_id.clone();
            store.put(&id, s, None).await.unwrap();
        }
        AdmissionGate::new(store, GateConfig::default())
    }

    #[tokio::test]
    async fn test_allows_without_state() {
        let gate = gate_with(vec![]).await;
        let decision = gate.decide("team-a", &AdmissionOperation::Create).await;
        assert_eq!(decision, AdmissionDecision::Allow);
    }

    #[tokio::test]
    async fn test_denies_create_when_blocking() {
        let gate = gate_with(vec![state("x", "team-a", true, &["cpu"])]).await;

        let decision = gate.decide("team-a", &AdmissionOperation::Create).await;
        assert!(decision.is_denied());
        assert_eq!(
            decision.reason().unwrap(),
            "Resource creation blocked: namespace team-a has reached resource quota critical threshold for: [cpu]"
        );

        // Other namespaces and operations are unaffected
        assert!(gate.decide("team-b", &AdmissionOperation::Create).await.is_allowed());
        assert!(gate.decide("team-a", &AdmissionOperation::Update).await.is_allowed());
        assert!(gate.decide("team-a", &AdmissionOperation::Delete).await.is_allowed());
    }

    #[tokio::test]
    async fn test_reason_is_union_of_blocking_states() {
        let gate = gate_with(vec![
            state("x", "team-a", true, &["memory", "cpu"]),
            state("y", "team-a", true, &["cpu", "pods"]),
            state("z", "team-a", false, &["storage"]),
        ])
        .await;

        let decision = gate.decide("team-a", &AdmissionOperation::Create).await;
        assert!(decision.reason().unwrap().ends_with("[cpu memory pods]"));
        assert_eq!(
            gate.blocking_resources("team-a").await.unwrap(),
            vec!["cpu", "memory", "pods"]
        );
    }

    #[tokio::test]
    async fn test_critical_without_blocking_allows() {
        let gate = gate_with(vec![state("x", "team-a", false, &["cpu"])]).await;
        assert!(gate.decide("team-a", &AdmissionOperation::Create).await.is_allowed());
    }

    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn get(&self, _: &EnforcerId) -> StoreResult<Option<Versioned<EnforcerState>>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn get_all_targeting(&self, _: &str) -> StoreResult<Vec<EnforcerState>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn put(&self, _: &EnforcerId, _: EnforcerState, _: Option<Version>) -> StoreResult<Version> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn delete(&self, _: &EnforcerId) -> StoreResult<bool> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn list(&self) -> StoreResult<Vec<(EnforcerId, Versioned<EnforcerState>)>> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl StateStore for SlowStore {
        async fn get(&self, _: &EnforcerId) -> StoreResult<Option<Versioned<EnforcerState>>> {
            Ok(None)
        }
        async fn get_all_targeting(&self, _: &str) -> StoreResult<Vec<EnforcerState>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
        async fn put(&self, _: &EnforcerId, _: EnforcerState, _: Option<Version>) -> StoreResult<Version> {
            Ok(1)
        }
        async fn delete(&self, _: &EnforcerId) -> StoreResult<bool> {
            Ok(false)
        }
        async fn list(&self) -> StoreResult<Vec<(EnforcerId, Versioned<EnforcerState>)>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let closed = AdmissionGate::new(Arc::new(BrokenStore), GateConfig::default());
        let decision = closed.decide("team-a", &AdmissionOperation::Create).await;
        assert!(decision.is_unavailable());
        assert!(!decision.is_allowed());

        let open = AdmissionGate::new(
            Arc::new(BrokenStore),
            GateConfig {
                failure_policy: FailurePolicy::FailOpen,
                ..Default::default()
            },
        );
        let decision = open.decide("team-a", &AdmissionOperation::Create).await;
        assert!(decision.is_unavailable());
        assert!(decision.is_allowed());

        // Ungated operations never touch the store
        assert_eq!(
            closed.decide("team-a", &AdmissionOperation::Delete).await,
            AdmissionDecision::Allow
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let gate = AdmissionGate::new(Arc::new(SlowStore), GateConfig::default());
        let decision = gate.decide("team-a", &AdmissionOperation::Create).await;
        match decision {
            AdmissionDecision::Unavailable { error, fallback } => {
                assert!(error.contains("timed out"));
                assert_eq!(fallback, FailurePolicy::FailClosed);
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }
}
