//! Quota Types - Core types for resource quota enforcement
//!
//! An enforcer binds a target namespace to per-resource thresholds and
//! enforcement actions. The reconciliation engine samples usage, classifies
//! it against those thresholds and publishes an [`EnforcerState`]; the
//! admission gate reads that state to decide whether new workloads may be
//! created in the namespace.
//!
//! ## Key Concepts
//!
//! - **EnforcerConfig**: Thresholds and actions for one target namespace
//! - **UsageSample**: Current usage against a limit for one resource
//! - **Classification**: Normal / warning / critical bucket for a sample
//! - **Alert**: Snapshot notice for a resource over a threshold
//! - **EnforcerState**: Last published evaluation, the gate's source of truth
//! - **Events**: Observability stream for reconciliation outcomes

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod alert;
pub mod enforcer;
pub mod error;
pub mod events;
pub mod ids;
pub mod manifest;
pub mod quantity;
pub mod state;
pub mod usage;

// Re-export main types
pub use alert::{Alert, AlertSeverity};
pub use enforcer::{EnforcementActions, EnforcerConfig, EnforcerSpec, ResourceThreshold};
pub use error::ConfigError;
pub use events::{EnforcerEvent, EnforcerEventEnvelope, EventSeverity};
pub use ids::EnforcerId;
pub use manifest::{
    EnforcerManifest, KindDecoder, KindRegistry, ObjectMeta, ENFORCER_API_VERSION, ENFORCER_KIND,
};
pub use quantity::Quantity;
pub use state::{ConditionKind, EnforcerState, EnforcerStatus, StatusCondition};
pub use usage::{Classification, ResourceUsage, UsageSample};
