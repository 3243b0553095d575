//! Postgres-backed [`RoomStore`].
//!
//! Tables are created by `db/migrations`. Record ids are `BIGSERIAL`, so
//! `ORDER BY id` is insertion order.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use wire::RoomId;

use super::store::{RecordId, RoomRecord, RoomRow, RoomStore, StoreError};

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "pg_store_test.rs"]
mod pg_store_test;

#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a room (or return the existing one with that slug).
    ///
    /// # Errors
    ///
    /// Returns a database error if the upsert fails.
    pub async fn create_room(&self, slug: &str) -> Result<RoomRow, StoreError> {
        let row = sqlx::query(
            "INSERT INTO rooms (slug) VALUES ($1)
             ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
             RETURNING id, slug",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(RoomRow { id: row.get("id"), slug: row.get("slug") })
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn find_room_by_slug(&self, slug: &str) -> Result<Option<RoomRow>, StoreError> {
        let row = sqlx::query("SELECT id, slug FROM rooms WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| RoomRow { id: r.get("id"), slug: r.get("slug") }))
    }

    async fn append_record(&self, room_id: RoomId, payload: &str, user_id: &str) -> Result<RecordId, StoreError> {
        let id: RecordId =
            sqlx::query_scalar("INSERT INTO room_records (room_id, payload, user_id) VALUES ($1, $2, $3) RETURNING id")
                .bind(room_id)
                .bind(payload)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(id)
    }

    async fn list_records(&self, room_id: RoomId) -> Result<Vec<RoomRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (RecordId, String, String)>(
            "SELECT id, payload, user_id FROM room_records WHERE room_id = $1 ORDER BY id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, payload, user_id)| RoomRecord { id, payload, user_id })
            .collect())
    }

    async fn update_record(&self, record_id: RecordId, payload: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE room_records SET payload = $2 WHERE id = $1")
            .bind(record_id)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound(record_id));
        }
        Ok(())
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM room_records WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound(record_id));
        }
        Ok(())
    }

    async fn add_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO room_members (room_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_member(&self, room_id: RoomId, user_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
