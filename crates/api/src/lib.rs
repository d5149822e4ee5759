mod auth;
pub mod routes;

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::broadcast;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use common::Signal;
use engine::SqliteSignalStore;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteSignalStore,
    pub dashboard_token: String,
    /// Every signal the scheduler emits, for WebSocket subscribers.
    pub signal_tx: broadcast::Sender<Signal>,
}

/// The full router with state applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::api_router(state.clone()))
        .merge(routes::ws_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Build and run the Axum API server.
pub async fn serve(state: AppState, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Dashboard API failed to bind");
            return;
        }
    };

    info!(%addr, "Dashboard API listening");
    if let Err(e) = axum::serve(listener, app(state)).await {
        error!(error = %e, "Dashboard API stopped");
    }
}
