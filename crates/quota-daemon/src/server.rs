//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, NotifierConfig, SamplerConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::notify::{AlertNotifier, LogNotifier, WebhookNotifier};
use crate::registry::EnforcerRegistry;
use crate::sampler::{HttpUsageSampler, StaticUsageSampler, UsageSampler};
use crate::scheduler::{ConfigEvent, Reconciler, Scheduler};
use quota_policy::{AdmissionGate, GateConfig};
use quota_state::{InMemoryStateStore, StateStore};
use quota_types::{EnforcerEventEnvelope, EnforcerId, KindRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Quota daemon server
pub struct Server {
    config: DaemonConfig,
    store: Arc<dyn StateStore>,
    registry: Arc<EnforcerRegistry>,
    scheduler: Arc<Scheduler>,
    gate: Arc<AdmissionGate>,
    kinds: Arc<KindRegistry>,
    event_tx: broadcast::Sender<EnforcerEventEnvelope>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let sampler: Arc<dyn UsageSampler> = match &config.sampler {
            SamplerConfig::Static { namespaces } => {
                Arc::new(StaticUsageSampler::from_table(namespaces.clone()))
            }
            SamplerConfig::Http { url, timeout_ms } => Arc::new(
                HttpUsageSampler::new(url, Duration::from_millis(*timeout_ms))
                    .map_err(|e| DaemonError::Sampler(e.to_string()))?,
            ),
        };

        let notifier: Arc<dyn AlertNotifier> = match &config.notifier {
            NotifierConfig::Log => Arc::new(LogNotifier),
            NotifierConfig::Webhook { timeout_ms } => Arc::new(
                WebhookNotifier::new(Duration::from_millis(*timeout_ms))
                    .map_err(|e| DaemonError::Config(e.to_string()))?,
            ),
        };

        Ok(Self::with_parts(
            config,
            Arc::new(InMemoryStateStore::new()),
            sampler,
            notifier,
        ))
    }

    /// Create a server from explicit collaborators
    pub fn with_parts(
        config: DaemonConfig,
        store: Arc<dyn StateStore>,
        sampler: Arc<dyn UsageSampler>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        // Create event channel
        let (event_tx, _) = broadcast::channel(1000);

        let registry = Arc::new(EnforcerRegistry::new());
        let reconciler = Arc::new(
            Reconciler::new(
                registry.clone(),
                store.clone(),
                sampler,
                notifier,
                event_tx.clone(),
            )
            .with_timeouts(
                config.scheduler.sample_timeout(),
                config.scheduler.store_timeout(),
            ),
        );
        let scheduler = Scheduler::new(
            config.scheduler.clone(),
            registry.clone(),
            reconciler,
            event_tx.clone(),
        );
        let gate = Arc::new(AdmissionGate::new(
            store.clone(),
            GateConfig::from(&config.gate),
        ));

        Self {
            config,
            store,
            registry,
            scheduler,
            gate,
            kinds: Arc::new(KindRegistry::with_builtin_kinds()),
            event_tx,
        }
    }

    /// Shared state for the REST API
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.store.clone(),
            self.registry.clone(),
            self.scheduler.clone(),
            self.gate.clone(),
            self.kinds.clone(),
            self.event_tx.clone(),
        )
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler.clone()
    }

    pub fn gate(&self) -> Arc<AdmissionGate> {
        self.gate.clone()
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<EnforcerEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Apply the manifests listed in the configuration.
    ///
    /// A manifest that fails to decode is recorded as rejected and skipped.
    /// Returns the number of accepted enforcers.
    pub async fn apply_configured_enforcers(&self) -> usize {
        let mut accepted = 0;
        for manifest in self.config.enforcers.clone() {
            let id = EnforcerId::new(&manifest.metadata.namespace, &manifest.metadata.name);
            let result = match self.kinds.decode(manifest) {
                Ok(config) => self.scheduler.apply(ConfigEvent::Applied(config)).await,
                Err(e) => {
                    self.scheduler.reject(&id, &e);
                    Err(e)
                }
            };
            match result {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!(enforcer = %id, error = %e, "Skipping configured enforcer"),
            }
        }
        accepted
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let accepted = self.apply_configured_enforcers().await;
        tracing::info!(enforcers = accepted, "Loaded configured enforcers");

        // Create router
        let app = create_router(self.app_state());

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Quota daemon listening on {}", addr);

        // Start scheduler in background
        let scheduler = self.scheduler.clone();
        let scheduler_task = tokio::spawn(async move {
            scheduler.start().await;
        });

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Quota daemon shutting down");

        // Stop scheduler and let in-flight passes finish
        self.scheduler.stop().await;
        if let Err(e) = scheduler_task.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
