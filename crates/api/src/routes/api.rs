use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use common::SignalKind;

use crate::{auth::require_auth, AppState};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/signals", get(get_signals))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Deserialize)]
struct SignalsQuery {
    kind: Option<String>,
    limit: Option<i64>,
}

/// Recent signals of one kind (default `pump`), newest first.
async fn get_signals(State(state): State<AppState>, Query(q): Query<SignalsQuery>) -> Response {
    let kind = match q.kind.as_deref().map(str::parse::<SignalKind>) {
        None => SignalKind::Pump,
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
    };
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match state.store.recent(kind, limit).await {
        Ok(signals) => Json(json!({
            "kind": kind,
            "count": signals.len(),
            "signals": signals,
        }))
        .into_response(),
        Err(e) => {
            warn!(%kind, error = %e, "Failed to load signals");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to load signals" })),
            )
                .into_response()
        }
    }
}
