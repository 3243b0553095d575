use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wire::{ClientMessage, Shape};

use super::*;
use crate::routes::app;
use crate::state::test_helpers::{test_app_state, wait_for_records};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn open(addr: SocketAddr, token: &str) -> Client {
    let (client, _response) = timeout(Duration::from_secs(2), connect_async(format!("ws://{addr}/api/ws?token={token}")))
        .await
        .expect("connect timed out")
        .expect("handshake failed");
    client
}

async fn send(client: &mut Client, message: &ClientMessage) {
    client.send(WsMessage::text(wire::encode(message).unwrap())).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(1), client.next())
            .await
            .expect("receive timed out")
            .expect("stream ended")
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return wire::decode_server(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    assert!(timeout(Duration::from_millis(100), client.next()).await.is_err(), "expected no frame");
}

async fn wait_for_room_size(state: &AppState, room_id: i64, size: usize) {
    timeout(Duration::from_secs(1), async {
        while state.registry.connections_in_room(room_id).await.len() != size {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("room membership did not settle");
}

fn rect() -> Shape {
    Shape::Rect { id: "s1".into(), x: 10.0, y: 10.0, width: 50.0, height: 50.0 }
}

#[tokio::test]
async fn missing_or_bad_token_is_rejected_before_upgrade() {
    let (state, _store) = test_app_state();
    let addr = serve(state.clone()).await;

    for url in [format!("ws://{addr}/api/ws"), format!("ws://{addr}/api/ws?token=bogus")] {
        let err = connect_async(url).await.expect_err("handshake should fail");
        match err {
            tokio_tungstenite::tungstenite::Error::Http(response) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(state.registry.connection_count().await, 0);
}

#[tokio::test]
async fn draw_is_relayed_between_room_members() {
    let (state, store) = test_app_state();
    let addr = serve(state.clone()).await;
    let mut x = open(addr, "tok-a").await;
    let mut y = open(addr, "tok-b").await;

    send(&mut x, &ClientMessage::JoinRoom { room_id: "abc".into() }).await;
    send(&mut y, &ClientMessage::JoinRoom { room_id: "abc".into() }).await;
    wait_for_room_size(&state, 1, 2).await;

    send(&mut x, &ClientMessage::Draw { room_id: "abc".into(), shape: rect() }).await;
    assert_eq!(recv(&mut y).await, ServerMessage::Draw { room_id: 1, shape: rect(), user_id: "alice".into() });
    assert_silent(&mut x).await;

    wait_for_records(&store, 1, 1).await;
}

#[tokio::test]
async fn other_rooms_and_bad_frames_stay_quiet() {
    let (state, _store) = test_app_state();
    let addr = serve(state.clone()).await;
    let mut a = open(addr, "tok-a").await;
    let mut b = open(addr, "tok-b").await;

    send(&mut a, &ClientMessage::JoinRoom { room_id: "abc".into() }).await;
    send(&mut b, &ClientMessage::JoinRoom { room_id: "def".into() }).await;
    wait_for_room_size(&state, 1, 1).await;
    wait_for_room_size(&state, 2, 1).await;

    a.send(WsMessage::text("not json")).await.unwrap();
    a.send(WsMessage::text(r#"{"type":"cursor"}"#)).await.unwrap();
    send(&mut a, &ClientMessage::Draw { room_id: "abc".into(), shape: rect() }).await;
    send(&mut a, &ClientMessage::Draw { room_id: "nowhere".into(), shape: rect() }).await;

    assert_silent(&mut b).await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn close_removes_connection_from_registry() {
    let (state, _store) = test_app_state();
    let addr = serve(state.clone()).await;
    let mut a = open(addr, "tok-a").await;
    send(&mut a, &ClientMessage::JoinRoom { room_id: "abc".into() }).await;
    wait_for_room_size(&state, 1, 1).await;

    a.close(None).await.unwrap();
    wait_for_room_size(&state, 1, 0).await;
    timeout(Duration::from_secs(1), async {
        while state.registry.connection_count().await != 0 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connection not removed");
}
