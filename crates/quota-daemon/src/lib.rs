//! Quota Daemon library
//!
//! This module provides the core components for the quota daemon:
//! - REST API handlers (enforcer configuration, status, admission)
//! - Usage sampler and alert notifier adapters
//! - Scheduler and reconciliation
//! - Server lifecycle management

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod registry;
pub mod sampler;
pub mod scheduler;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use notify::{AlertNotification, AlertNotifier, LogNotifier, NotificationError, WebhookNotifier};
pub use registry::EnforcerRegistry;
pub use sampler::{HttpUsageSampler, SampleError, StaticUsageSampler, UsageSampler};
pub use scheduler::{ConfigEvent, Scheduler};
pub use server::Server;
