mod gestures;
mod session;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wire::ClientMessage;

use crate::gestures::GestureError;
use crate::session::RoomSession;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing token; pass --token or set SYNCDRAW_TOKEN")]
    MissingToken,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("timed out connecting to websocket")]
    Timeout,
    #[error("{context}: {message}")]
    ServerError { context: String, message: String },
    #[error("envelope encode failed: {0}")]
    Wire(#[from] wire::WireError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Gesture(#[from] GestureError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "syncdraw-cli", about = "Headless client for shared drawing rooms")]
struct Cli {
    #[arg(long, env = "SYNCDRAW_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "SYNCDRAW_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server health endpoint.
    Ping,
    /// Print a room's persisted shapes as JSON.
    Shapes { slug: String },
    /// Join a room and print every remote change until Ctrl-C.
    Watch { slug: String },
    /// Draw a rectangle into a room.
    DrawRect {
        slug: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, allow_negative_numbers = true)]
        width: f64,
        #[arg(long, allow_negative_numbers = true)]
        height: f64,
    },
    /// Move a shape by an offset.
    Move {
        slug: String,
        id: String,
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        dx: f64,
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        dy: f64,
    },
    /// Erase a shape.
    Erase { slug: String, id: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Shapes { slug } => {
            let shapes = session::fetch_shapes(&cli.base_url, &slug).await?;
            print_json(&serde_json::to_value(shapes)?)
        }
        Command::Watch { slug } => run_watch(&cli.base_url, require_token(cli.token)?, &slug).await,
        Command::DrawRect { slug, x, y, width, height } => {
            let mut room = RoomSession::open(&cli.base_url, &require_token(cli.token)?, &slug).await?;
            let (id, messages) = gestures::draw_rect(&mut room.engine, x, y, width, height)?;
            finish(room, &messages).await?;
            print_json(&json!({ "id": id }))
        }
        Command::Move { slug, id, dx, dy } => {
            let mut room = RoomSession::open(&cli.base_url, &require_token(cli.token)?, &slug).await?;
            let messages = gestures::move_shape(&mut room.engine, &id, dx, dy)?;
            finish(room, &messages).await?;
            print_json(&json!({ "id": id, "sent": messages.len() }))
        }
        Command::Erase { slug, id } => {
            let mut room = RoomSession::open(&cli.base_url, &require_token(cli.token)?, &slug).await?;
            let messages = gestures::erase_shape(&mut room.engine, &id)?;
            finish(room, &messages).await?;
            print_json(&json!({ "id": id, "sent": messages.len() }))
        }
    }
}

fn require_token(token: Option<String>) -> Result<String, CliError> {
    token.filter(|t| !t.is_empty()).ok_or(CliError::MissingToken)
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            context: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_watch(base_url: &str, token: String, slug: &str) -> Result<(), CliError> {
    let mut room = RoomSession::open(base_url, &token, slug).await?;
    eprintln!("watching room {slug} ({} shapes); Ctrl-C to leave", room.engine.shapes().len());

    loop {
        tokio::select! {
            event = room.next_event() => match event {
                Ok(Some(message)) => print_json(&event_line(&message, room.engine.shapes().len())?)?,
                Ok(None) => {
                    eprintln!("connection closed by server");
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("connection lost: {e}");
                    return Ok(());
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                room.leave().await;
                return Ok(());
            }
        }
    }
}

/// One watch output line: the remote envelope and the resulting store size.
fn event_line(message: &wire::ServerMessage, shapes: usize) -> Result<Value, CliError> {
    Ok(json!({ "event": serde_json::to_value(message)?, "shapes": shapes }))
}

async fn finish(mut room: RoomSession, messages: &[ClientMessage]) -> Result<(), CliError> {
    room.send_all(messages).await?;
    room.leave().await;
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}
