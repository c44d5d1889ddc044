//! Configuration for quota-daemon

use quota_policy::{FailurePolicy, GateConfig};
use quota_types::{EnforcerManifest, ResourceUsage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Admission gate configuration
    #[serde(default)]
    pub gate: GateSettings,

    /// Usage source
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Alert delivery
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Enforcer manifests applied at startup
    #[serde(default)]
    pub enforcers: Vec<EnforcerManifest>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of enforcers evaluated concurrently
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciliations: usize,

    /// Retry backoff
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Upper bound on one usage query
    #[serde(default = "default_sample_timeout")]
    pub sample_timeout_ms: u64,

    /// Upper bound on one state store call
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
}

impl SchedulerConfig {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciliations: default_max_concurrent(),
            backoff: BackoffConfig::default(),
            sample_timeout_ms: default_sample_timeout(),
            store_timeout_ms: default_store_timeout(),
        }
    }
}

/// Backoff configuration for retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial backoff delay (milliseconds)
    pub initial_delay_ms: u64,

    /// Maximum backoff delay (milliseconds)
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add jitter to delays
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Admission gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSettings {
    /// Upper bound on the state read per decision
    #[serde(default = "default_gate_timeout")]
    pub read_timeout_ms: u64,

    /// Answer when state cannot be read
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_gate_timeout(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl From<&GateSettings> for GateConfig {
    fn from(settings: &GateSettings) -> Self {
        GateConfig {
            read_timeout: Duration::from_millis(settings.read_timeout_ms),
            failure_policy: settings.failure_policy,
        }
    }
}

/// Usage source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SamplerConfig {
    /// Fixed usage table (for development/testing)
    Static {
        /// Usage per namespace
        #[serde(default)]
        namespaces: HashMap<String, Vec<ResourceUsage>>,
    },

    /// Remote usage-reporting service
    Http {
        /// Base URL
        url: String,

        /// Request timeout in milliseconds
        #[serde(default = "default_http_timeout")]
        timeout_ms: u64,
    },
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig::Static {
            namespaces: HashMap::new(),
        }
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotifierConfig {
    /// Log alerts only
    Log,

    /// POST alerts to the channel URL configured on each enforcer
    Webhook {
        /// Request timeout in milliseconds
        #[serde(default = "default_http_timeout")]
        timeout_ms: u64,
    },
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Webhook {
            timeout_ms: default_http_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_max_concurrent() -> usize {
    10
}

fn default_sample_timeout() -> u64 {
    5_000
}

fn default_store_timeout() -> u64 {
    2_000
}

fn default_gate_timeout() -> u64 {
    500
}

fn default_http_timeout() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and `QUOTA_` variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Environment variables: QUOTA_SERVER__LISTEN_ADDR, QUOTA_GATE__FAILURE_POLICY, ...
        builder = builder.add_source(
            config::Environment::with_prefix("QUOTA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
