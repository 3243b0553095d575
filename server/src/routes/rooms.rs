//! Room snapshot route.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{error, warn};
use wire::Shape;

use crate::state::AppState;

#[cfg(test)]
#[path = "rooms_test.rs"]
mod rooms_test;

/// `GET /api/rooms/{slug}/shapes`: persisted shapes, oldest first.
///
/// Records whose payload no longer decodes as a shape are skipped.
pub async fn list_shapes(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<Shape>>, StatusCode> {
    let room = state
        .store
        .find_room_by_slug(&slug)
        .await
        .map_err(|e| {
            error!(error = %e, %slug, "room lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let records = state.store.list_records(room.id).await.map_err(|e| {
        error!(error = %e, room_id = room.id, "list records failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let shapes = records
        .into_iter()
        .filter_map(|record| match wire::decode_record_payload(&record.payload) {
            Ok(shape) => Some(shape),
            Err(e) => {
                warn!(error = %e, record_id = record.id, room_id = room.id, "skipping undecodable record");
                None
            }
        })
        .collect();
    Ok(Json(shapes))
}
