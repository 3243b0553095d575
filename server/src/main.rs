mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};
use crate::services::auth::{Authenticator, SessionAuthenticator, StaticAuthenticator};
use crate::services::pg_store::PgRoomStore;
use crate::services::store::{MemoryRoomStore, RoomStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database init: {0}")]
    Database(#[from] sqlx::Error),
    #[error("seeding rooms: {0}")]
    Seed(#[from] StoreError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // A missing .env file is normal outside local development.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let (store, auth) = collaborators(&config).await?;

    let persist_tx = services::persistence::spawn_persistence_worker(store.clone(), config.persist_queue_capacity);
    let state = state::AppState::new(store, auth, persist_tx, config.relay);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, dev_mode = config.dev_mode(), "syncdraw listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Room store and authenticator for the configured mode.
async fn collaborators(config: &ServerConfig) -> Result<(Arc<dyn RoomStore>, Arc<dyn Authenticator>), StartupError> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!(
            rooms = config.dev_rooms.len(),
            tokens = config.dev_tokens.len(),
            "DATABASE_URL not set; running in dev mode with in-memory rooms"
        );
        let store = MemoryRoomStore::with_rooms(config.dev_rooms.iter().cloned());
        let auth = StaticAuthenticator::new(config.dev_tokens.clone());
        return Ok((Arc::new(store), Arc::new(auth)));
    };

    let pool = db::init_pool(database_url, config.db_max_connections).await?;
    let store = PgRoomStore::new(pool.clone());
    for slug in &config.dev_rooms {
        let room = store.create_room(slug).await?;
        tracing::info!(room_id = room.id, %slug, "ensured room");
    }
    Ok((Arc::new(store), Arc::new(SessionAuthenticator::new(pool))))
}
