//! Live connection registry.
//!
//! DESIGN
//! ======
//! One entry per open websocket: the authenticated subject, the set of
//! numeric rooms the socket has joined, and the sender half of its
//! outbound queue. The registry is the only owner of membership state;
//! handlers never keep their own copies of room sets.
//!
//! Fan-out takes a read lock, so a concurrent `remove` simply waits for the
//! in-flight broadcast to finish and the removed socket is never targeted
//! afterwards. Sends use `try_send`: a full or closed queue is skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;
use wire::{RoomId, ServerMessage};

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

/// Identity of one live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Entry {
    user_id: String,
    rooms: HashSet<RoomId>,
    tx: mpsc::Sender<ServerMessage>,
}

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ConnectionId, Entry>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with an empty room set.
    pub async fn register(&self, id: ConnectionId, user_id: &str, tx: mpsc::Sender<ServerMessage>) {
        let entry = Entry { user_id: user_id.to_owned(), rooms: HashSet::new(), tx };
        self.inner.write().await.insert(id, entry);
    }

    /// Drop a connection. Returns the rooms it had joined.
    pub async fn remove(&self, id: ConnectionId) -> Vec<RoomId> {
        let removed = self.inner.write().await.remove(&id);
        removed.map(|entry| entry.rooms.into_iter().collect()).unwrap_or_default()
    }

    /// Add a room to a connection's set. Returns `false` if the connection
    /// is unknown (already closed).
    pub async fn join(&self, id: ConnectionId, room_id: RoomId) -> bool {
        match self.inner.write().await.get_mut(&id) {
            Some(entry) => {
                entry.rooms.insert(room_id);
                true
            }
            None => false,
        }
    }

    /// Remove a room from a connection's set. Returns `false` if the
    /// connection is unknown.
    pub async fn leave(&self, id: ConnectionId, room_id: RoomId) -> bool {
        match self.inner.write().await.get_mut(&id) {
            Some(entry) => {
                entry.rooms.remove(&room_id);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub async fn rooms_of(&self, id: ConnectionId) -> HashSet<RoomId> {
        self.inner.read().await.get(&id).map(|entry| entry.rooms.clone()).unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn user_of(&self, id: ConnectionId) -> Option<String> {
        self.inner.read().await.get(&id).map(|entry| entry.user_id.clone())
    }

    /// Connections whose room set contains `room_id`, in no particular order.
    pub async fn connections_in_room(&self, room_id: RoomId) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.rooms.contains(&room_id))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Send `message` to every connection in `room_id` except `exclude`.
    /// Returns how many queues accepted it.
    pub async fn broadcast(&self, room_id: RoomId, message: &ServerMessage, exclude: Option<ConnectionId>) -> usize {
        let connections = self.inner.read().await;
        let mut delivered = 0;
        for (id, entry) in connections.iter() {
            if exclude == Some(*id) || !entry.rooms.contains(&room_id) {
                continue;
            }
            match entry.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(connection_id = %id, user_id = %entry.user_id, room_id, error = %e, "skipping fan-out target"),
            }
        }
        delivered
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
