use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use wire::Shape;

use super::*;
use crate::config::RelayConfig;
use crate::services::store::{RecordId, RoomRecord, RoomRow, RoomStore, StoreError};
use crate::state::test_helpers::*;

fn rect(id: &str) -> Shape {
    Shape::Rect { id: id.into(), x: 10.0, y: 10.0, width: 50.0, height: 50.0 }
}

async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("receive timed out")
        .expect("channel closed")
}

async fn assert_silent(rx: &mut mpsc::Receiver<ServerMessage>) {
    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err(), "expected no message");
}

async fn join(state: &AppState, conn: &Connection, slug: &str) -> RelayOutcome {
    handle(state, conn, ClientMessage::JoinRoom { room_id: slug.into() }).await
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

#[tokio::test]
async fn join_adds_room_and_records_membership() {
    let (state, store) = test_app_state();
    let (alice, _rx) = connect(&state, "alice").await;

    assert_eq!(join(&state, &alice, "abc").await, RelayOutcome::Joined(1));
    assert!(state.registry.rooms_of(alice.id).await.contains(&1));

    timeout(Duration::from_secs(1), async {
        while store.members(1).await.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("membership not persisted");
    assert_eq!(store.members(1).await, vec!["alice".to_owned()]);
}

#[tokio::test]
async fn leave_removes_room() {
    let (state, _store) = test_app_state();
    let (alice, _rx) = connect(&state, "alice").await;
    join(&state, &alice, "abc").await;

    let outcome = handle(&state, &alice, ClientMessage::LeaveRoom { room_id: "abc".into() }).await;
    assert_eq!(outcome, RelayOutcome::Left(1));
    assert!(state.registry.rooms_of(alice.id).await.is_empty());
}

#[tokio::test]
async fn unknown_slug_is_dropped_without_joining() {
    let (state, _store) = test_app_state();
    let (alice, _rx) = connect(&state, "alice").await;

    let outcome = join(&state, &alice, "nope").await;
    assert_eq!(outcome, RelayOutcome::Dropped(DropReason::UnknownRoom("nope".into())));
    assert!(state.registry.rooms_of(alice.id).await.is_empty());
}

// =============================================================================
// FAN-OUT
// =============================================================================

#[tokio::test]
async fn draw_reaches_peer_with_numeric_room_and_author() {
    let (state, store) = test_app_state();
    let (x, mut rx_x) = connect(&state, "alice").await;
    let (y, mut rx_y) = connect(&state, "bob").await;
    join(&state, &x, "abc").await;
    join(&state, &y, "abc").await;

    let outcome = handle(&state, &x, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    assert_eq!(outcome, RelayOutcome::Broadcast { room_id: 1, delivered: 1 });
    assert_eq!(
        recv(&mut rx_y).await,
        ServerMessage::Draw { room_id: 1, shape: rect("s1"), user_id: "alice".into() }
    );
    assert_silent(&mut rx_x).await;

    let records = wait_for_records(&store, 1, 1).await;
    assert_eq!(wire::decode_record_payload(&records[0].payload).unwrap(), rect("s1"));
}

#[tokio::test]
async fn echo_to_sender_includes_author() {
    let relay = RelayConfig { echo_to_sender: true, ..RelayConfig::default() };
    let (state, _store) = test_app_state_with_relay(relay);
    let (x, mut rx_x) = connect(&state, "alice").await;
    join(&state, &x, "abc").await;

    let outcome = handle(&state, &x, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    assert_eq!(outcome, RelayOutcome::Broadcast { room_id: 1, delivered: 1 });
    assert!(matches!(recv(&mut rx_x).await, ServerMessage::Draw { room_id: 1, .. }));
}

#[tokio::test]
async fn rooms_are_isolated() {
    let (state, _store) = test_app_state();
    let (a, _rx_a) = connect(&state, "alice").await;
    let (b, mut rx_b) = connect(&state, "bob").await;
    join(&state, &a, "abc").await;
    join(&state, &b, "def").await;

    let outcome = handle(&state, &a, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    assert_eq!(outcome, RelayOutcome::Broadcast { room_id: 1, delivered: 0 });
    assert_silent(&mut rx_b).await;
}

#[tokio::test]
async fn sender_need_not_have_joined() {
    let (state, _store) = test_app_state();
    let (a, _rx_a) = connect(&state, "alice").await;
    let (b, mut rx_b) = connect(&state, "bob").await;
    join(&state, &b, "abc").await;

    handle(&state, &a, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    assert!(matches!(recv(&mut rx_b).await, ServerMessage::Draw { .. }));
}

#[tokio::test]
async fn move_upserts_persisted_record() {
    let (state, store) = test_app_state();
    let (x, _rx_x) = connect(&state, "alice").await;
    let (y, mut rx_y) = connect(&state, "bob").await;
    join(&state, &x, "abc").await;
    join(&state, &y, "abc").await;

    handle(&state, &x, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    let moved = Shape::Rect { id: "s1".into(), x: 40.0, y: 40.0, width: 50.0, height: 50.0 };
    handle(&state, &x, ClientMessage::MoveShape { room_id: "abc".into(), shape: moved.clone() }).await;

    recv(&mut rx_y).await;
    assert_eq!(
        recv(&mut rx_y).await,
        ServerMessage::MoveShape { room_id: 1, shape: moved.clone(), user_id: "alice".into() }
    );

    timeout(Duration::from_secs(1), async {
        loop {
            let records = store.list_records(1).await.unwrap();
            if records.len() == 1 && wire::decode_record_payload(&records[0].payload).unwrap() == moved {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("move not persisted as upsert");
}

#[tokio::test]
async fn delete_fans_out_and_removes_record() {
    let (state, store) = test_app_state();
    let (x, _rx_x) = connect(&state, "alice").await;
    let (y, mut rx_y) = connect(&state, "bob").await;
    join(&state, &y, "abc").await;

    handle(&state, &x, ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") }).await;
    wait_for_records(&store, 1, 1).await;
    handle(&state, &x, ClientMessage::DeleteShape { room_id: "abc".into(), shape_id: "s1".into() }).await;

    recv(&mut rx_y).await;
    assert_eq!(
        recv(&mut rx_y).await,
        ServerMessage::DeleteShape { room_id: 1, shape_id: "s1".into(), user_id: "alice".into() }
    );
    wait_for_records(&store, 1, 0).await;
}

// =============================================================================
// DISCARDED INPUT
// =============================================================================

#[tokio::test]
async fn malformed_and_unknown_frames_are_discarded() {
    let (state, _store) = test_app_state();
    let (a, _rx) = connect(&state, "alice").await;

    assert_eq!(handle_text(&state, &a, "not json").await, RelayOutcome::Malformed);
    assert_eq!(handle_text(&state, &a, r#"{"type":"draw","roomId":"abc"}"#).await, RelayOutcome::Malformed);
    assert_eq!(handle_text(&state, &a, r#"{"type":"cursor","x":1}"#).await, RelayOutcome::Ignored);
}

#[tokio::test]
async fn chat_alias_is_treated_as_draw() {
    let (state, _store) = test_app_state();
    let (a, _rx_a) = connect(&state, "alice").await;
    let (b, mut rx_b) = connect(&state, "bob").await;
    join(&state, &b, "abc").await;

    let text = r#"{"type":"chat","roomId":"abc","shape":{"type":"circle","id":"c1","centerX":1,"centerY":2,"radius":3}}"#;
    assert_eq!(handle_text(&state, &a, text).await, RelayOutcome::Broadcast { room_id: 1, delivered: 1 });
    assert!(matches!(recv(&mut rx_b).await, ServerMessage::Draw { shape: Shape::Circle { .. }, .. }));
}

// =============================================================================
// STORE FAILURES
// =============================================================================

/// Store that can fail lookups and always fails writes.
struct FailingStore {
    fail_lookup: bool,
}

#[async_trait]
impl RoomStore for FailingStore {
    async fn find_room_by_slug(&self, slug: &str) -> Result<Option<RoomRow>, StoreError> {
        if self.fail_lookup {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(Some(RoomRow { id: 1, slug: slug.to_owned() }))
    }

    async fn append_record(&self, room_id: RoomId, _: &str, _: &str) -> Result<RecordId, StoreError> {
        Err(StoreError::RoomNotFound(room_id))
    }

    async fn list_records(&self, _: RoomId) -> Result<Vec<RoomRecord>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn update_record(&self, record_id: RecordId, _: &str) -> Result<(), StoreError> {
        Err(StoreError::RecordNotFound(record_id))
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError> {
        Err(StoreError::RecordNotFound(record_id))
    }

    async fn add_member(&self, _: RoomId, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn remove_member(&self, _: RoomId, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[tokio::test]
async fn lookup_failure_drops_envelope() {
    let state = test_app_state_with_store(Arc::new(FailingStore { fail_lookup: true }), RelayConfig::default());
    let (a, _rx) = connect(&state, "alice").await;

    let outcome = join(&state, &a, "abc").await;
    assert!(matches!(outcome, RelayOutcome::Dropped(DropReason::Lookup(_))));
    assert!(state.registry.rooms_of(a.id).await.is_empty());
}

#[tokio::test]
async fn write_failures_do_not_block_join_or_fan_out() {
    let state = test_app_state_with_store(Arc::new(FailingStore { fail_lookup: false }), RelayConfig::default());
    let (a, _rx_a) = connect(&state, "alice").await;
    let (b, mut rx_b) = connect(&state, "bob").await;

    assert_eq!(join(&state, &a, "abc").await, RelayOutcome::Joined(1));
    assert_eq!(join(&state, &b, "abc").await, RelayOutcome::Joined(1));

    for message in [
        ClientMessage::Draw { room_id: "abc".into(), shape: rect("s1") },
        ClientMessage::MoveShape { room_id: "abc".into(), shape: rect("s1") },
        ClientMessage::DeleteShape { room_id: "abc".into(), shape_id: "s1".into() },
    ] {
        assert_eq!(handle(&state, &a, message).await, RelayOutcome::Broadcast { room_id: 1, delivered: 1 });
        recv(&mut rx_b).await;
    }
}
