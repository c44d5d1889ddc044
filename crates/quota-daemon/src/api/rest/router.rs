//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::daemon_status))
        // Enforcers
        .route("/enforcers", get(handlers::list_enforcers))
        .route(
            "/enforcers/:namespace/:name",
            get(handlers::get_enforcer)
                .put(handlers::apply_enforcer)
                .delete(handlers::delete_enforcer),
        )
        // Admission
        .route("/admission", post(handlers::review_admission));

    // Build router with middleware
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
