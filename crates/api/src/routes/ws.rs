use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use common::Signal;

use crate::auth::{token_matches, unauthorized};
use crate::AppState;

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws/signals", get(ws_signals_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Streams every newly emitted signal as one JSON text frame.
/// Auth via query param `?token=<DASHBOARD_TOKEN>` (header auth not supported
/// in browser WebSocket API).
async fn ws_signals_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
) -> Response {
    if !token_matches(&state, q.token.as_deref()) {
        return unauthorized();
    }

    let signal_rx = state.signal_tx.subscribe();
    ws.on_upgrade(move |socket| handle_ws(socket, signal_rx))
}

async fn handle_ws(mut socket: WebSocket, mut signal_rx: broadcast::Receiver<Signal>) {
    loop {
        match signal_rx.recv().await {
            Ok(signal) => {
                let frame = match serde_json::to_string(&signal) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(market = %signal.market, error = %e, "Could not encode signal");
                        continue;
                    }
                };
                if socket.send(Message::Text(frame)).await.is_err() {
                    debug!("WebSocket signal client disconnected");
                    break;
                }
            }
            Err(RecvError::Lagged(n)) => {
                warn!(dropped = n, "WebSocket signal client lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
