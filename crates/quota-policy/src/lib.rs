//! # Quota Policy
//!
//! Pure threshold evaluation and the admission gate.
//!
//! ## Overview
//!
//! The [`ThresholdEvaluator`] turns a configuration and a set of usage
//! samples into usage classifications, alerts and a blocking flag. It does
//! no I/O and is deterministic apart from the timestamp it is handed.
//!
//! The [`AdmissionGate`] answers "may this request create a workload in
//! namespace N?" from one snapshot of published enforcer state. It never
//! mutates state and never fails silently: store failures become
//! [`AdmissionDecision::Unavailable`], interpreted through the configured
//! [`FailurePolicy`].
//!
//! ## Key Components
//!
//! - [`ThresholdEvaluator`]: Classification and alert generation
//! - [`EvaluationResult`]: Output of one evaluation
//! - [`AdmissionGate`]: Snapshot-read admission decisions
//! - [`AdmissionDecision`]: Allow, deny with reason, or unavailable
//!
//! ## Example
//!
//! ```rust,no_run
//! use quota_policy::{AdmissionGate, AdmissionOperation, GateConfig};
//! use quota_state::InMemoryStateStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let gate = AdmissionGate::new(Arc::new(InMemoryStateStore::new()), GateConfig::default());
//!
//! let decision = gate.decide("team-a", &AdmissionOperation::Create).await;
//! if !decision.is_allowed() {
//!     println!("denied: {:?}", decision.reason());
//! }
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod decision;
pub mod error;
pub mod evaluator;
pub mod gate;

pub use decision::{AdmissionDecision, AdmissionOperation, FailurePolicy};
pub use error::{GateError, Result};
pub use evaluator::{EvaluationResult, ThresholdEvaluator};
pub use gate::{AdmissionGate, GateConfig};
