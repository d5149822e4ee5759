use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Health check endpoint. No auth required.
/// Reports 503 when the signal database cannot be read.
async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.count_since(Utc::now() - Duration::hours(24)).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "signals_24h": count })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check could not read signal store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "error": e.to_string() })),
            )
        }
    }
}
