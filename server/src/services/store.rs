//! Room persistence collaborator.
//!
//! DESIGN
//! ======
//! The relay only needs a handful of operations: resolve a slug, append or
//! rewrite a record, list a room's records, and track membership. They sit
//! behind [`RoomStore`] so the relay runs identically against Postgres
//! ([`super::pg_store::PgRoomStore`]) and the in-memory store used in dev
//! mode and tests.
//!
//! Records are opaque payload strings. The relay stores `{"shape": ...}`
//! and finds a shape's record by scanning payloads for the embedded id.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use wire::RoomId;

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

/// Identifier of a persisted record.
pub type RecordId = i64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row returned from room lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRow {
    pub id: RoomId,
    pub slug: String,
}

/// One persisted record in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: RecordId,
    pub payload: String,
    pub user_id: String,
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Resolve a human-readable slug to its room.
    async fn find_room_by_slug(&self, slug: &str) -> Result<Option<RoomRow>, StoreError>;

    /// Append a record and return its id.
    async fn append_record(&self, room_id: RoomId, payload: &str, user_id: &str) -> Result<RecordId, StoreError>;

    /// All records of a room, oldest first.
    async fn list_records(&self, room_id: RoomId) -> Result<Vec<RoomRecord>, StoreError>;

    /// Replace a record's payload in place.
    async fn update_record(&self, record_id: RecordId, payload: &str) -> Result<(), StoreError>;

    /// Remove a record.
    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError>;

    async fn add_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError>;

    async fn remove_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Debug, Clone)]
struct StoredRecord {
    room_id: RoomId,
    payload: String,
    user_id: String,
}

#[derive(Debug, Default)]
struct MemoryInner {
    rooms: HashMap<String, RoomRow>,
    records: BTreeMap<RecordId, StoredRecord>,
    members: HashSet<(RoomId, String)>,
    next_room_id: RoomId,
    next_record_id: RecordId,
}

/// Process-local [`RoomStore`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given room slugs, ids assigned in order from 1.
    #[must_use]
    pub fn with_rooms<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = MemoryInner::default();
        for slug in slugs {
            insert_room(&mut inner, slug.into());
        }
        Self { inner: RwLock::new(inner) }
    }

    /// Create a room (or return the existing one with that slug).
    #[cfg(test)]
    pub async fn create_room(&self, slug: &str) -> RoomRow {
        let mut inner = self.inner.write().await;
        insert_room(&mut inner, slug.to_owned())
    }

    /// Subjects currently recorded as members of a room.
    #[cfg(test)]
    pub async fn members(&self, room_id: RoomId) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut members: Vec<String> =
            inner.members.iter().filter(|(r, _)| *r == room_id).map(|(_, u)| u.clone()).collect();
        members.sort();
        members
    }
}

fn insert_room(inner: &mut MemoryInner, slug: String) -> RoomRow {
    if let Some(existing) = inner.rooms.get(&slug) {
        return existing.clone();
    }
    inner.next_room_id += 1;
    let row = RoomRow { id: inner.next_room_id, slug: slug.clone() };
    inner.rooms.insert(slug, row.clone());
    row
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn find_room_by_slug(&self, slug: &str) -> Result<Option<RoomRow>, StoreError> {
        Ok(self.inner.read().await.rooms.get(slug).cloned())
    }

    async fn append_record(&self, room_id: RoomId, payload: &str, user_id: &str) -> Result<RecordId, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.rooms.values().any(|r| r.id == room_id) {
            return Err(StoreError::RoomNotFound(room_id));
        }
        inner.next_record_id += 1;
        let id = inner.next_record_id;
        inner.records.insert(
            id,
            StoredRecord { room_id, payload: payload.to_owned(), user_id: user_id.to_owned() },
        );
        Ok(id)
    }

    async fn list_records(&self, room_id: RoomId) -> Result<Vec<RoomRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|(_, r)| r.room_id == room_id)
            .map(|(id, r)| RoomRecord { id: *id, payload: r.payload.clone(), user_id: r.user_id.clone() })
            .collect())
    }

    async fn update_record(&self, record_id: RecordId, payload: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&record_id).ok_or(StoreError::RecordNotFound(record_id))?;
        payload.clone_into(&mut record.payload);
        Ok(())
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.records.remove(&record_id).ok_or(StoreError::RecordNotFound(record_id))?;
        Ok(())
    }

    async fn add_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError> {
        self.inner.write().await.members.insert((room_id, user_id.to_owned()));
        Ok(())
    }

    async fn remove_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError> {
        self.inner.write().await.members.remove(&(room_id, user_id.to_owned()));
        Ok(())
    }
}
