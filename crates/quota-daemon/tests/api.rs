use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use quota_daemon::api::create_router;
use quota_daemon::config::DaemonConfig;
use quota_daemon::{LogNotifier, Server, StaticUsageSampler};
use quota_policy::FailurePolicy;
use quota_state::{
    InMemoryStateStore, StateStore, StoreError, StoreResult, Version, Versioned,
};
use quota_types::{EnforcerId, EnforcerState, Quantity, ResourceUsage};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct UnavailableStore;

#[async_trait]
impl StateStore for UnavailableStore {
    async fn get(&self, _id: &EnforcerId) -> StoreResult<Option<Versioned<EnforcerState>>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn get_all_targeting(&self, _namespace: &str) -> StoreResult<Vec<EnforcerState>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn put(
        &self,
        _id: &EnforcerId,
        _state: EnforcerState,
        _expected: Option<Version>,
    ) -> StoreResult<Version> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn delete(&self, _id: &EnforcerId) -> StoreResult<bool> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn list(&self) -> StoreResult<Vec<(EnforcerId, Versioned<EnforcerState>)>> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}

fn server_with(store: Arc<dyn StateStore>, config: DaemonConfig) -> Server {
    let sampler = StaticUsageSampler::new();
    sampler.set_namespace(
        "team-a",
        vec![ResourceUsage::new(
            "cpu",
            Quantity::from_value(97.0),
            Quantity::from_value(100.0),
        )],
    );
    Server::with_parts(config, store, Arc::new(sampler), Arc::new(LogNotifier))
}

fn running_app() -> Router {
    let server = server_with(Arc::new(InMemoryStateStore::new()), DaemonConfig::default());
    let scheduler = server.scheduler();
    tokio::spawn(async move { scheduler.start().await });
    create_router(server.app_state())
}

fn manifest(name: &str, warning: u32, critical: u32) -> Value {
    json!({
        "apiVersion": "quota.maple.dev/v1",
        "kind": "ResourceQuotaEnforcer",
        "metadata": { "name": name, "namespace": "ops" },
        "spec": {
            "targetNamespace": "team-a",
            "resourceThresholds": [{
                "resourceName": "cpu",
                "warningThresholdPercent": warning,
                "criticalThresholdPercent": critical
            }],
            "actions": { "blockNewDeployments": true },
            "checkIntervalSeconds": 60
        }
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn admission(app: &Router, namespace: &str, operation: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/admission",
        Some(json!({ "namespace": namespace, "operation": operation })),
    )
    .await
}

#[tokio::test]
async fn health_returns_200() {
    let app = running_app();
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn applied_enforcer_reports_status_and_blocks() {
    let app = running_app();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/enforcers/ops/cpu-quota",
        Some(manifest("cpu-quota", 80, 90)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spec"]["targetNamespace"], "team-a");

    let mut view = Value::Null;
    for _ in 0..200 {
        let (_, body) = send(&app, "GET", "/api/v1/enforcers/ops/cpu-quota", None).await;
        if body["status"]["observedVersion"].is_u64() {
            view = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(view["status"]["isBlocking"], true);
    assert_eq!(view["status"]["currentResourceUsage"][0]["usedPercentage"], 97);
    assert_eq!(view["status"]["activeAlerts"][0]["severity"], "critical");

    let (status, body) = admission(&app, "team-a", "CREATE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["decision"], "deny");
    assert!(body["reason"].as_str().unwrap().contains("[cpu]"));

    let (_, body) = admission(&app, "team-a", "DELETE").await;
    assert_eq!(body["allowed"], true);

    let (status, body) = send(&app, "GET", "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["blocked_namespaces"], json!(["team-a"]));
    assert_eq!(body["stats"]["blocked_resources"]["team-a"], json!(["cpu"]));
}

#[tokio::test]
async fn inverted_thresholds_are_rejected() {
    let app = running_app();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/enforcers/ops/cpu-quota",
        Some(manifest("cpu-quota", 95, 80)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // The rejection stays visible on the enforcer
    let (status, body) = send(&app, "GET", "/api/v1/enforcers/ops/cpu-quota", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("spec").is_none());
    assert_eq!(body["status"]["conditions"][0]["kind"], "ConfigInvalid");
}

#[tokio::test]
async fn manifest_must_match_path() {
    let app = running_app();
    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/enforcers/ops/other",
        Some(manifest("cpu-quota", 80, 90)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_enforcer_is_not_found() {
    let app = running_app();
    let (status, body) = send(&app, "GET", "/api/v1/enforcers/ops/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, "DELETE", "/api/v1/enforcers/ops/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_returns_no_content() {
    let app = running_app();
    send(
        &app,
        "PUT",
        "/api/v1/enforcers/ops/cpu-quota",
        Some(manifest("cpu-quota", 80, 90)),
    )
    .await;

    let (status, _) = send(&app, "DELETE", "/api/v1/enforcers/ops/cpu-quota", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/v1/enforcers/ops/cpu-quota", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admission_requires_namespace() {
    let app = running_app();
    let (status, _) = admission(&app, " ", "CREATE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_state_answers_503_with_policy() {
    let mut config = DaemonConfig::default();
    config.gate.failure_policy = FailurePolicy::FailOpen;
    let server = server_with(Arc::new(UnavailableStore), config);
    let app = create_router(server.app_state());

    let (status, body) = admission(&app, "team-a", "CREATE").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["decision"], "unavailable");
    assert_eq!(body["allowed"], true);

    let server = server_with(Arc::new(UnavailableStore), DaemonConfig::default());
    let app = create_router(server.app_state());
    let (status, body) = admission(&app, "team-a", "CREATE").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["allowed"], false);
}
