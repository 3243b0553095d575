//! WebSocket handler: authenticated room relay transport.
//!
//! DESIGN
//! ======
//! The bearer credential travels as `?token=` on the upgrade URL and is
//! resolved before the upgrade; a bad token never gets a socket. After
//! upgrade the connection is registered and enters a `select!` loop:
//! - inbound text frames → `relay::handle_text`
//! - fan-out from room peers → encode and forward to the socket
//!
//! LIFECYCLE
//! =========
//! 1. Authenticate → upgrade → register with an empty room set
//! 2. Client frames are relayed; nothing is ever sent back in reply
//! 3. Close or error → remove from registry before anything else runs

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wire::ServerMessage;

use crate::services::registry::ConnectionId;
use crate::services::relay::{self, Connection, RelayOutcome};
use crate::state::AppState;

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.get("token") else {
        return (StatusCode::UNAUTHORIZED, "token required").into_response();
    };

    let user_id = match state.auth.authenticate(token).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "invalid or expired token").into_response(),
        Err(e) => {
            error!(error = %e, "ws token validation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "token validation error").into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: String) {
    let conn = Connection { id: ConnectionId::new(), user_id };
    let (conn_tx, mut conn_rx) = mpsc::channel::<ServerMessage>(state.relay.outbound_capacity);
    state.registry.register(conn.id, &conn.user_id, conn_tx).await;
    let connections = state.registry.connection_count().await;
    info!(connection_id = %conn.id, user_id = %conn.user_id, connections, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        log_outcome(&conn, relay::handle_text(&state, &conn, text.as_str()).await);
                    }
                    Message::Close(_) => break,
                    Message::Binary(_) => {
                        warn!(connection_id = %conn.id, "ws: ignoring binary frame");
                    }
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            Some(message) = conn_rx.recv() => {
                if send_message(&mut socket, &conn, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    let rooms = state.registry.remove(conn.id).await;
    info!(connection_id = %conn.id, user_id = %conn.user_id, ?rooms, "ws: client disconnected");
}

fn log_outcome(conn: &Connection, outcome: RelayOutcome) {
    match outcome {
        RelayOutcome::Broadcast { room_id, delivered } => {
            debug!(connection_id = %conn.id, room_id, delivered, "ws: fan-out");
        }
        RelayOutcome::Joined(room_id) | RelayOutcome::Left(room_id) => {
            debug!(connection_id = %conn.id, room_id, "ws: membership changed");
        }
        RelayOutcome::Dropped(reason) => debug!(connection_id = %conn.id, %reason, "ws: dropped"),
        RelayOutcome::Ignored | RelayOutcome::Malformed => {}
    }
}

/// Encode and send one outbound envelope. An envelope that fails to encode
/// is skipped; only a socket failure is an error.
async fn send_message(socket: &mut WebSocket, conn: &Connection, message: &ServerMessage) -> Result<(), axum::Error> {
    let text = match wire::encode(message) {
        Ok(text) => text,
        Err(e) => {
            warn!(connection_id = %conn.id, error = %e, "ws: failed to encode outbound envelope");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}
