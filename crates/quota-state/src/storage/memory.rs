//! In-memory state storage.
//!
//! Every write updates the state table and the namespace index under one
//! lock, so readers never observe a half-applied write and namespace
//! lookups touch only the enforcers that target the namespace.

use async_trait::async_trait;
use quota_types::{EnforcerId, EnforcerState};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::traits::{StateStore, Version, Versioned};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    /// Latest state per enforcer.
    states: HashMap<EnforcerId, Versioned<EnforcerState>>,

    /// Enforcers indexed by target namespace.
    by_namespace: HashMap<String, BTreeSet<EnforcerId>>,

    /// Last version handed out.
    last_version: Version,
}

impl Inner {
    fn unindex(&mut self, namespace: &str, id: &EnforcerId) {
        if let Some(ids) = self.by_namespace.get_mut(namespace) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_namespace.remove(namespace);
            }
        }
    }
}

/// In-memory state store for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    inner: RwLock<Inner>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored states.
    pub async fn len(&self) -> usize {
        self.inner.read().await.states.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, id: &EnforcerId) -> StoreResult<Option<Versioned<EnforcerState>>> {
        let inner = self.inner.read().await;
        Ok(inner.states.get(id).cloned())
    }

    async fn get_all_targeting(&self, namespace: &str) -> StoreResult<Vec<EnforcerState>> {
        let inner = self.inner.read().await;
        let Some(ids) = inner.by_namespace.get(namespace) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| inner.states.get(id))
            .map(|v| v.value.clone())
            .collect())
    }

    async fn put(
        &self,
        id: &EnforcerId,
        state: EnforcerState,
        expected: Option<Version>,
    ) -> StoreResult<Version> {
        if &state.enforcer_id != id {
            return Err(StoreError::InvalidData(format!(
                "state for {} written under {}",
                state.enforcer_id, id
            )));
        }

        let mut inner = self.inner.write().await;

        let current = inner.states.get(id).map(|v| v.version);
        if current != expected {
            return Err(StoreError::Conflict {
                enforcer_id: id.clone(),
                expected,
                actual: current,
            });
        }

        let previous_namespace = inner
            .states
            .get(id)
            .map(|v| v.value.target_namespace.clone());
        if let Some(previous) = previous_namespace {
            if previous != state.target_namespace {
                inner.unindex(&previous, id);
            }
        }

        inner.last_version += 1;
        let version = inner.last_version;

        inner
            .by_namespace
            .entry(state.target_namespace.clone())
            .or_default()
            .insert(id.clone());
        inner.states.insert(
            id.clone(),
            Versioned {
                version,
                value: state,
            },
        );

        tracing::trace!(enforcer = %id, version, "Stored enforcer state");
        Ok(version)
    }

    async fn delete(&self, id: &EnforcerId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.states.remove(id) {
            Some(removed) => {
                inner.unindex(&removed.value.target_namespace, id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> StoreResult<Vec<(EnforcerId, Versioned<EnforcerState>)>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .states
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
