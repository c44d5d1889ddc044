//! Admission decision handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use quota_policy::{AdmissionDecision, AdmissionOperation};
use quota_types::{EnforcerEvent, EnforcerEventEnvelope};
use serde::{Deserialize, Serialize};

/// Admission request
#[derive(Debug, Deserialize)]
pub struct AdmissionRequest {
    pub namespace: String,
    pub operation: String,
}

/// Admission response
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `allow`, `deny` or `unavailable`
    pub decision: String,
}

/// Decide whether a workload operation may proceed.
///
/// An unavailable decision answers 503 so callers can tell it apart from
/// an allow; `allowed` still reflects the configured failure policy.
pub async fn review_admission(
    State(state): State<AppState>,
    Json(request): Json<AdmissionRequest>,
) -> ApiResult<(StatusCode, Json<AdmissionResponse>)> {
    if request.namespace.trim().is_empty() {
        return Err(ApiError::BadRequest("namespace is required".to_string()));
    }

    let operation = AdmissionOperation::from(request.operation.as_str());
    let decision = state.gate.decide(&request.namespace, &operation).await;

    if let AdmissionDecision::Deny { resources, .. } = &decision {
        let _ = state
            .event_tx
            .send(EnforcerEventEnvelope::new(EnforcerEvent::AdmissionDenied {
                namespace: request.namespace.clone(),
                resources: resources.clone(),
            }));
    }

    let status = if decision.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(AdmissionResponse {
            allowed: decision.is_allowed(),
            reason: decision.reason().map(str::to_string),
            decision: decision.label().to_string(),
        }),
    ))
}
