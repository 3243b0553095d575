//! Live room connection for terminal commands.
//!
//! A session mirrors the browser client's startup: load the HTTP snapshot
//! into an [`EngineCore`], open the websocket, send `join_room`. Leaving
//! sends a best-effort `leave_room` and closes the socket.

use std::time::Duration;

use canvas::engine::EngineCore;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use wire::{ClientMessage, ServerMessage, Shape};

use crate::CliError;

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the websocket URL for a base HTTP(S) URL and bearer token. The
/// token is form-encoded into the query.
///
/// # Errors
///
/// [`CliError::InvalidBaseUrl`] unless the base starts with `http://` or
/// `https://` and parses as a URL.
pub fn ws_url(base_url: &str, token: &str) -> Result<String, CliError> {
    let base = base_url.trim_end_matches('/');
    let endpoint = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}/api/ws")
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}/api/ws")
    } else {
        return Err(CliError::InvalidBaseUrl(base_url.to_owned()));
    };

    reqwest::Url::parse_with_params(&endpoint, &[("token", token)])
        .map(String::from)
        .map_err(|_| CliError::InvalidBaseUrl(base_url.to_owned()))
}

/// `GET /api/rooms/{slug}/shapes`.
///
/// # Errors
///
/// HTTP failures, a non-success status, or an undecodable body.
pub async fn fetch_shapes(base_url: &str, slug: &str) -> Result<Vec<Shape>, CliError> {
    let url = format!("{}/api/rooms/{slug}/shapes", base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            context: format!("HTTP {}", status.as_u16()),
            message: format!("loading shapes for room {slug:?}"),
        });
    }
    Ok(response.json::<Vec<Shape>>().await?)
}

pub struct RoomSession {
    pub engine: EngineCore,
    stream: WsStream,
}

impl RoomSession {
    /// Seed from HTTP, connect, and join `slug`.
    ///
    /// # Errors
    ///
    /// Snapshot, connect or send failures.
    pub async fn open(base_url: &str, token: &str, slug: &str) -> Result<Self, CliError> {
        let shapes = fetch_shapes(base_url, slug).await?;
        let mut engine = EngineCore::new(slug);
        engine.seed(shapes);
        info!(room = %slug, shapes = engine.shapes().len(), "seeded room snapshot");

        let url = ws_url(base_url, token)?;
        let (stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| CliError::Timeout)?
            .map_err(|error| CliError::WsConnect(Box::new(error)))?;

        let mut session = Self { engine, stream };
        let join = session.engine.join_message();
        session.send(&join).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Encode or socket failures.
    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), CliError> {
        let text = wire::encode(message)?;
        debug!(kind = message.type_name(), "sending envelope");
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|error| CliError::WsConnect(Box::new(error)))
    }

    /// # Errors
    ///
    /// The first send failure.
    pub async fn send_all(&mut self, messages: &[ClientMessage]) -> Result<(), CliError> {
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }

    /// Next envelope from the server, merged into the engine. `Ok(None)`
    /// once the socket closes.
    ///
    /// # Errors
    ///
    /// Socket errors. Undecodable frames are skipped.
    pub async fn next_event(&mut self) -> Result<Option<ServerMessage>, CliError> {
        loop {
            let Some(frame) = self.stream.next().await else {
                return Ok(None);
            };
            match frame.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => match wire::decode_server(text.as_str()) {
                    Ok(message) => {
                        self.engine.apply_remote(message.clone());
                        return Ok(Some(message));
                    }
                    Err(e) => warn!(error = %e, "skipping undecodable frame"),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
    }

    /// Best-effort `leave_room`, then close.
    pub async fn leave(mut self) {
        let leave = self.engine.leave_message();
        if let Err(e) = self.send(&leave).await {
            warn!(error = %e, "leave_room not delivered");
        }
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "close handshake failed");
        }
    }
}
