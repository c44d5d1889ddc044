//! Storage trait definition.
//!
//! Defines the "read latest / write latest" contract the reconciler and the
//! admission gate share.

use async_trait::async_trait;
use quota_types::{EnforcerId, EnforcerState};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Opaque version token returned by reads and writes.
pub type Version = u64;

/// A stored value together with the version it was written at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: Version,
    pub value: T,
}

/// Trait for enforcer state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the latest state for an enforcer.
    async fn get(&self, id: &EnforcerId) -> StoreResult<Option<Versioned<EnforcerState>>>;

    /// Snapshot of every state whose enforcer targets `namespace`.
    ///
    /// All entries come from one consistent view of the store.
    async fn get_all_targeting(&self, namespace: &str) -> StoreResult<Vec<EnforcerState>>;

    /// Conditionally write a state.
    ///
    /// `expected` must equal the version currently stored (`None` when no
    /// state exists yet); otherwise the write fails with a conflict.
    /// Returns the new version.
    async fn put(
        &self,
        id: &EnforcerId,
        state: EnforcerState,
        expected: Option<Version>,
    ) -> StoreResult<Version>;

    /// Delete the state for an enforcer. Returns whether a state existed.
    async fn delete(&self, id: &EnforcerId) -> StoreResult<bool>;

    /// List all stored states.
    async fn list(&self) -> StoreResult<Vec<(EnforcerId, Versioned<EnforcerState>)>>;

    /// Check whether any enforcer targeting `namespace` is blocking.
    async fn is_blocking(&self, namespace: &str) -> StoreResult<bool> {
        Ok(self
            .get_all_targeting(namespace)
            .await?
            .iter()
            .any(|s| s.is_blocking))
    }
}
