//! Enforcer configuration and status handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::scheduler::ConfigEvent;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use quota_types::{EnforcerId, EnforcerManifest, EnforcerSpec, EnforcerStatus};
use serde::Serialize;

/// An enforcer as reported by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerView {
    pub namespace: String,
    pub name: String,
    /// Accepted configuration; absent when only rejected updates were seen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<EnforcerSpec>,
    pub status: EnforcerStatus,
}

async fn load_view(state: &AppState, id: &EnforcerId) -> ApiResult<Option<EnforcerView>> {
    if !state.registry.contains(id) {
        return Ok(None);
    }

    let published = state.store.get(id).await?;
    let status = EnforcerStatus::from_state(
        published.as_ref().map(|v| &v.value),
        published.as_ref().map(|v| v.version),
        state.registry.conditions(id),
    );

    Ok(Some(EnforcerView {
        namespace: id.namespace().to_string(),
        name: id.name().to_string(),
        spec: state.registry.get(id).map(|c| c.spec),
        status,
    }))
}

/// List all enforcers with their status
pub async fn list_enforcers(State(state): State<AppState>) -> ApiResult<Json<Vec<EnforcerView>>> {
    let mut views = Vec::new();
    for id in state.registry.ids() {
        if let Some(view) = load_view(&state, &id).await? {
            views.push(view);
        }
    }
    Ok(Json(views))
}

/// Get one enforcer
pub async fn get_enforcer(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<EnforcerView>> {
    let id = EnforcerId::new(&namespace, &name);
    let view = load_view(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Enforcer {} not found", id)))?;
    Ok(Json(view))
}

/// Create or update an enforcer from a manifest
pub async fn apply_enforcer(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(manifest): Json<EnforcerManifest>,
) -> ApiResult<Json<EnforcerView>> {
    let id = EnforcerId::new(&namespace, &name);
    if manifest.metadata.namespace != namespace || manifest.metadata.name != name {
        return Err(ApiError::BadRequest(format!(
            "manifest metadata {}/{} does not match path {}",
            manifest.metadata.namespace, manifest.metadata.name, id
        )));
    }

    let config = match state.kinds.decode(manifest) {
        Ok(config) => config,
        Err(e) => {
            state.scheduler.reject(&id, &e);
            return Err(e.into());
        }
    };

    state.scheduler.apply(ConfigEvent::Applied(config)).await?;

    let view = load_view(&state, &id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Enforcer {} vanished after apply", id)))?;
    Ok(Json(view))
}

/// Delete an enforcer; its published state is removed asynchronously
pub async fn delete_enforcer(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let id = EnforcerId::new(&namespace, &name);
    if !state.registry.contains(&id) {
        return Err(ApiError::NotFound(format!("Enforcer {} not found", id)));
    }

    state.scheduler.apply(ConfigEvent::Deleted(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
