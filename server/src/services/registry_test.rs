use super::*;
use tokio::time::{Duration, timeout};
use wire::Shape;

fn draw(room_id: RoomId) -> ServerMessage {
    ServerMessage::Draw {
        room_id,
        shape: Shape::Rect { id: "s1".into(), x: 10.0, y: 10.0, width: 50.0, height: 50.0 },
        user_id: "alice".into(),
    }
}

async fn assert_receives(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("receive timed out")
        .expect("channel closed")
}

async fn assert_empty(rx: &mut mpsc::Receiver<ServerMessage>) {
    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err(), "expected no message");
}

#[tokio::test]
async fn register_starts_with_no_rooms() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId::new();
    let (tx, _rx) = mpsc::channel(4);
    registry.register(id, "alice", tx).await;

    assert_eq!(registry.connection_count().await, 1);
    assert!(registry.rooms_of(id).await.is_empty());
    assert_eq!(registry.user_of(id).await.as_deref(), Some("alice"));
}

#[tokio::test]
async fn join_and_leave_update_room_set() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId::new();
    let (tx, _rx) = mpsc::channel(4);
    registry.register(id, "alice", tx).await;

    assert!(registry.join(id, 1).await);
    assert!(registry.join(id, 2).await);
    assert_eq!(registry.connections_in_room(1).await, vec![id]);

    assert!(registry.leave(id, 1).await);
    assert!(registry.connections_in_room(1).await.is_empty());
    assert_eq!(registry.rooms_of(id).await, HashSet::from([2]));
}

#[tokio::test]
async fn join_unknown_connection_is_rejected() {
    let registry = ConnectionRegistry::new();
    assert!(!registry.join(ConnectionId::new(), 1).await);
    assert!(!registry.leave(ConnectionId::new(), 1).await);
}

#[tokio::test]
async fn remove_returns_joined_rooms_and_stops_delivery() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel(4);
    registry.register(id, "alice", tx).await;
    registry.join(id, 7).await;

    assert_eq!(registry.remove(id).await, vec![7]);
    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(registry.broadcast(7, &draw(7), None).await, 0);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn broadcast_excludes_author_and_other_rooms() {
    let registry = ConnectionRegistry::new();
    let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(4);
    let (tx_c, mut rx_c) = mpsc::channel(4);
    registry.register(a, "alice", tx_a).await;
    registry.register(b, "bob", tx_b).await;
    registry.register(c, "carol", tx_c).await;
    registry.join(a, 1).await;
    registry.join(b, 1).await;
    registry.join(c, 2).await;

    assert_eq!(registry.broadcast(1, &draw(1), Some(a)).await, 1);
    assert_eq!(assert_receives(&mut rx_b).await, draw(1));
    assert_empty(&mut rx_a).await;
    assert_empty(&mut rx_c).await;
}

#[tokio::test]
async fn broadcast_skips_full_and_closed_queues() {
    let registry = ConnectionRegistry::new();
    let (full, closed, open) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
    let (tx_full, _rx_full) = mpsc::channel(1);
    let (tx_closed, rx_closed) = mpsc::channel(1);
    let (tx_open, mut rx_open) = mpsc::channel(4);
    tx_full.try_send(draw(1)).unwrap();
    drop(rx_closed);

    for (id, tx) in [(full, tx_full), (closed, tx_closed), (open, tx_open)] {
        registry.register(id, "u", tx).await;
        registry.join(id, 1).await;
    }

    assert_eq!(registry.broadcast(1, &draw(1), None).await, 1);
    assert_eq!(assert_receives(&mut rx_open).await, draw(1));
}

#[tokio::test]
async fn concurrent_register_remove_and_broadcast() {
    let registry = ConnectionRegistry::new();
    let mut tasks = Vec::new();
    for i in 0..32 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let id = ConnectionId::new();
            let (tx, _rx) = mpsc::channel(4);
            registry.register(id, &format!("user-{i}"), tx).await;
            registry.join(id, 1).await;
            registry.broadcast(1, &draw(1), Some(id)).await;
            registry.remove(id).await;
        }));
    }
    for task in tasks {
        timeout(Duration::from_secs(2), task).await.expect("task timed out").unwrap();
    }
    assert_eq!(registry.connection_count().await, 0);
}
