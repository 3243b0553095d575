//! Room relay: routes one inbound envelope from a connection.
//!
//! DESIGN
//! ======
//! Every room-scoped envelope resolves its slug through the room store
//! first. Join/leave mutate the registry; shape operations queue a
//! persistence job and fan out to the room tagged with the numeric room id
//! and the author's subject id. Persistence is queued, never awaited, so
//! fan-out latency does not depend on storage.
//!
//! ERROR HANDLING
//! ==============
//! Nothing is reported back to the sender. Malformed frames, unknown
//! envelope types and unresolvable slugs are logged and dropped; the
//! returned [`RelayOutcome`] records which case applied.

use tracing::{debug, info, warn};
use wire::{ClientMessage, RoomId, ServerMessage};

use super::persistence::{PersistJob, enqueue};
use super::registry::ConnectionId;
use crate::state::AppState;

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

/// The sending side of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("unknown room {0:?}")]
    UnknownRoom(String),
    #[error("room lookup failed: {0}")]
    Lookup(String),
}

/// What the relay did with one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Joined(RoomId),
    Left(RoomId),
    Broadcast { room_id: RoomId, delivered: usize },
    Dropped(DropReason),
    Ignored,
    Malformed,
}

/// Decode and route one text frame.
pub async fn handle_text(state: &AppState, conn: &Connection, text: &str) -> RelayOutcome {
    match wire::decode_client(text) {
        Ok(message) => handle(state, conn, message).await,
        Err(e) => {
            warn!(connection_id = %conn.id, error = %e, "discarding malformed frame");
            RelayOutcome::Malformed
        }
    }
}

/// Route one decoded envelope.
pub async fn handle(state: &AppState, conn: &Connection, message: ClientMessage) -> RelayOutcome {
    let Some(slug) = message.room_slug().map(str::to_owned) else {
        debug!(connection_id = %conn.id, "ignoring envelope of unknown type");
        return RelayOutcome::Ignored;
    };
    let room_id = match resolve_room(state, &slug).await {
        Ok(room_id) => room_id,
        Err(reason) => {
            warn!(connection_id = %conn.id, %slug, kind = message.type_name(), %reason, "dropping envelope");
            return RelayOutcome::Dropped(reason);
        }
    };

    match message {
        ClientMessage::JoinRoom { .. } => {
            if !state.registry.join(conn.id, room_id).await {
                debug!(connection_id = %conn.id, room_id, "join from closed connection");
            }
            enqueue(&state.persist_tx, PersistJob::AddMember { room_id, user_id: conn.user_id.clone() });
            let members = state.registry.connections_in_room(room_id).await.len();
            info!(connection_id = %conn.id, user_id = %conn.user_id, room_id, %slug, members, "joined room");
            RelayOutcome::Joined(room_id)
        }
        ClientMessage::LeaveRoom { .. } => {
            state.registry.leave(conn.id, room_id).await;
            enqueue(&state.persist_tx, PersistJob::RemoveMember { room_id, user_id: conn.user_id.clone() });
            info!(connection_id = %conn.id, user_id = %conn.user_id, room_id, %slug, "left room");
            RelayOutcome::Left(room_id)
        }
        ClientMessage::Draw { shape, .. } => {
            debug!(
                connection_id = %conn.id,
                room_id,
                shape_id = shape.id(),
                kind = shape.kind(),
                "draw envelope"
            );
            enqueue(
                &state.persist_tx,
                PersistJob::Append { room_id, shape: shape.clone(), user_id: conn.user_id.clone() },
            );
            let out = ServerMessage::Draw { room_id, shape, user_id: conn.user_id.clone() };
            fan_out(state, conn, room_id, &out).await
        }
        ClientMessage::MoveShape { shape, .. } => {
            debug!(
                connection_id = %conn.id,
                room_id,
                shape_id = shape.id(),
                kind = shape.kind(),
                "move envelope"
            );
            enqueue(
                &state.persist_tx,
                PersistJob::Upsert { room_id, shape: shape.clone(), user_id: conn.user_id.clone() },
            );
            let out = ServerMessage::MoveShape { room_id, shape, user_id: conn.user_id.clone() };
            fan_out(state, conn, room_id, &out).await
        }
        ClientMessage::DeleteShape { shape_id, .. } => {
            enqueue(&state.persist_tx, PersistJob::Delete { room_id, shape_id: shape_id.clone() });
            let out = ServerMessage::DeleteShape { room_id, shape_id, user_id: conn.user_id.clone() };
            fan_out(state, conn, room_id, &out).await
        }
        ClientMessage::Unknown => RelayOutcome::Ignored,
    }
}

async fn resolve_room(state: &AppState, slug: &str) -> Result<RoomId, DropReason> {
    match state.store.find_room_by_slug(slug).await {
        Ok(Some(room)) => Ok(room.id),
        Ok(None) => Err(DropReason::UnknownRoom(slug.to_owned())),
        Err(e) => Err(DropReason::Lookup(e.to_string())),
    }
}

async fn fan_out(state: &AppState, conn: &Connection, room_id: RoomId, message: &ServerMessage) -> RelayOutcome {
    let exclude = (!state.relay.echo_to_sender).then_some(conn.id);
    let delivered = state.registry.broadcast(room_id, message, exclude).await;
    debug!(connection_id = %conn.id, room_id, delivered, "fan-out");
    RelayOutcome::Broadcast { room_id, delivered }
}
