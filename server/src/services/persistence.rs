//! Persistence worker: applies relay writes to the room store off the
//! websocket path.
//!
//! DESIGN
//! ======
//! The relay never awaits storage. Each write becomes a [`PersistJob`] on a
//! bounded queue drained by one background task, so jobs apply in the order
//! the relay accepted them and a slow database only ever backs up the queue.
//!
//! `Upsert` and `Delete` locate records by the shape id embedded in each
//! payload with a linear scan of the room's records.
//!
//! ERROR HANDLING
//! ==============
//! Enqueue is best-effort: a full or closed queue drops the job with a
//! warning. A failed job is logged and skipped. Live fan-out has already
//! happened by then, so the only casualty is the durable log.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use wire::{RoomId, Shape, ShapeId, WireError};

use super::store::{RoomStore, StoreError};

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("payload encode failed: {0}")]
    Encode(#[from] WireError),
}

/// One write the relay wants made durable.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistJob {
    Append { room_id: RoomId, shape: Shape, user_id: String },
    Upsert { room_id: RoomId, shape: Shape, user_id: String },
    Delete { room_id: RoomId, shape_id: ShapeId },
    AddMember { room_id: RoomId, user_id: String },
    RemoveMember { room_id: RoomId, user_id: String },
}

impl PersistJob {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Append { .. } => "append",
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
            Self::AddMember { .. } => "add_member",
            Self::RemoveMember { .. } => "remove_member",
        }
    }

    #[must_use]
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Append { room_id, .. }
            | Self::Upsert { room_id, .. }
            | Self::Delete { room_id, .. }
            | Self::AddMember { room_id, .. }
            | Self::RemoveMember { room_id, .. } => *room_id,
        }
    }
}

/// Spawn the worker and return its queue sender. The task exits once every
/// sender is dropped and the queue is drained.
#[must_use]
pub fn spawn_persistence_worker(store: Arc<dyn RoomStore>, capacity: usize) -> mpsc::Sender<PersistJob> {
    let (tx, mut rx) = mpsc::channel::<PersistJob>(capacity);
    info!(queue_capacity = capacity, "persistence worker configured");

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let kind = job.kind();
            let room_id = job.room_id();
            if let Err(e) = apply_job(store.as_ref(), job).await {
                warn!(error = %e, kind, room_id, "persist job failed; skipping");
            }
        }
        info!("persistence worker stopped");
    });

    tx
}

/// Non-blocking enqueue. Returns `false` if the job was dropped.
pub fn enqueue(tx: &mpsc::Sender<PersistJob>, job: PersistJob) -> bool {
    match tx.try_send(job) {
        Ok(()) => true,
        Err(TrySendError::Full(job)) => {
            warn!(kind = job.kind(), room_id = job.room_id(), "persist queue full; dropping job");
            false
        }
        Err(TrySendError::Closed(job)) => {
            warn!(kind = job.kind(), room_id = job.room_id(), "persist queue closed; dropping job");
            false
        }
    }
}

/// Apply one job to the store.
///
/// # Errors
///
/// Returns the first store or encode failure.
pub async fn apply_job(store: &dyn RoomStore, job: PersistJob) -> Result<(), PersistError> {
    match job {
        PersistJob::Append { room_id, shape, user_id } => {
            let payload = wire::encode_record_payload(&shape)?;
            store.append_record(room_id, &payload, &user_id).await?;
        }
        PersistJob::Upsert { room_id, shape, user_id } => {
            let payload = wire::encode_record_payload(&shape)?;
            let existing = store
                .list_records(room_id)
                .await?
                .into_iter()
                .find(|record| wire::record_shape_id(&record.payload).is_ok_and(|id| id == shape.id()));
            match existing {
                Some(record) => store.update_record(record.id, &payload).await?,
                None => {
                    store.append_record(room_id, &payload, &user_id).await?;
                }
            }
        }
        PersistJob::Delete { room_id, shape_id } => {
            let records = store.list_records(room_id).await?;
            for record in records {
                if wire::record_shape_id(&record.payload).is_ok_and(|id| id == shape_id) {
                    store.delete_record(record.id).await?;
                }
            }
        }
        PersistJob::AddMember { room_id, user_id } => store.add_member(room_id, &user_id).await?,
        PersistJob::RemoveMember { room_id, user_id } => store.remove_member(room_id, &user_id).await?,
    }
    Ok(())
}
