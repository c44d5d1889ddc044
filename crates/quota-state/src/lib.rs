//! # Quota State
//!
//! Durable record of the last evaluation for every enforcer.
//!
//! The reconciliation engine is the only writer; it uses conditional writes
//! keyed on a version token so two evaluations of the same enforcer can never
//! silently overwrite each other. The admission gate reads a consistent
//! snapshot of every state targeting a namespace, with no transactional
//! coupling to writes.
//!
//! ## Key Components
//!
//! - [`StateStore`]: Storage trait (get / snapshot by namespace / conditional put / delete)
//! - [`InMemoryStateStore`]: In-process implementation with a namespace index
//! - [`Versioned`]: A stored value together with its version token

#![deny(unsafe_code)]

pub mod error;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use storage::{InMemoryStateStore, StateStore, Version, Versioned};
