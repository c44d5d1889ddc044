//! Health and status handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, Json};
use quota_types::ConditionKind;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Daemon status response
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub scheduler_running: bool,
    pub stats: DaemonStats,
}

/// Daemon statistics
#[derive(Debug, Serialize)]
pub struct DaemonStats {
    pub total_enforcers: usize,
    pub rejected_enforcers: usize,
    pub failing_enforcers: usize,
    pub blocking_enforcers: usize,
    pub blocked_namespaces: Vec<String>,
    /// Critical resources behind each blocked namespace
    pub blocked_resources: BTreeMap<String, Vec<String>>,
}

/// Daemon status endpoint
pub async fn daemon_status(State(state): State<AppState>) -> ApiResult<Json<DaemonStatusResponse>> {
    let published = state.store.list().await?;

    let ids = state.registry.ids();
    let has_condition = |kind: ConditionKind| {
        ids.iter()
            .filter(|id| state.registry.conditions(id).iter().any(|c| c.kind == kind))
            .count()
    };

    let blocking: Vec<_> = published
        .iter()
        .filter(|(_, v)| v.value.is_blocking)
        .collect();
    let blocked_namespaces: BTreeSet<String> = blocking
        .iter()
        .map(|(_, v)| v.value.target_namespace.clone())
        .collect();

    let mut blocked_resources = BTreeMap::new();
    for namespace in &blocked_namespaces {
        let resources = state
            .gate
            .blocking_resources(namespace)
            .await
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        blocked_resources.insert(namespace.clone(), resources);
    }

    Ok(Json(DaemonStatusResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        scheduler_running: state.scheduler.is_running().await,
        stats: DaemonStats {
            total_enforcers: ids.len(),
            rejected_enforcers: has_condition(ConditionKind::ConfigInvalid),
            failing_enforcers: has_condition(ConditionKind::EvaluationFailing),
            blocking_enforcers: blocking.len(),
            blocked_namespaces: blocked_namespaces.into_iter().collect(),
            blocked_resources,
        },
    }))
}
