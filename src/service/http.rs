//! Admin HTTP API
//!
//! - `GET /health/live`: process is up
//! - `GET /health/ready`: the collection answers
//! - `GET /metrics`: Prometheus text

use crate::common::{Error, METRICS};
use crate::engine::Collection;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AdminState {
    pub collection: Collection,
}

pub fn create_router(state: AdminState) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route("/metrics", get(metrics))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health_live() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn health_ready(State(state): State<AdminState>) -> impl IntoResponse {
    match state.collection.count_documents().await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "collection": state.collection.namespace(),
                "documents": count,
                "open_cursors": state.collection.open_cursors(),
            })),
        ),
        Err(e) => {
            let err = Error::from(e);
            tracing::warn!(error = %err, "readiness check failed");
            (
                err.to_http_status(),
                Json(json!({ "status": "unavailable", "error": err.to_string() })),
            )
        }
    }
}

async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        METRICS.to_prometheus(),
    )
}
