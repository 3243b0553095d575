//! Server configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default so a bare `cargo run` starts a usable dev server.
//! Leaving `DATABASE_URL` unset selects dev mode: rooms and tokens come from
//! `DEV_ROOMS` / `DEV_TOKENS` and live in memory only.
//!
//! ERROR HANDLING
//! ==============
//! A value that is present but unparseable is a startup error. Silently
//! falling back to a default would hide typos in deployment config.

use std::collections::HashMap;
use std::str::FromStr;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;
const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 4096;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
    #[error("invalid DEV_TOKENS entry {0:?}: expected token=subject")]
    DevToken(String),
}

/// Relay behaviour shared by every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Include the author in room fan-out.
    pub echo_to_sender: bool,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { echo_to_sender: false, outbound_capacity: DEFAULT_OUTBOUND_CAPACITY }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` selects dev mode (in-memory rooms, static tokens).
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub relay: RelayConfig,
    pub persist_queue_capacity: usize,
    pub dev_rooms: Vec<String>,
    /// Token -> subject id.
    pub dev_tokens: HashMap<String, String>,
}

impl ServerConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        Ok(Self {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            database_url,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            relay: RelayConfig {
                echo_to_sender: parse_bool(&lookup, "RELAY_ECHO_TO_SENDER", false)?,
                outbound_capacity: parse_capacity(&lookup, "RELAY_OUTBOUND_CAPACITY", DEFAULT_OUTBOUND_CAPACITY)?,
            },
            persist_queue_capacity: parse_capacity(&lookup, "PERSIST_QUEUE_CAPACITY", DEFAULT_PERSIST_QUEUE_CAPACITY)?,
            dev_rooms: lookup("DEV_ROOMS").map(|v| split_list(&v)).unwrap_or_default(),
            dev_tokens: parse_tokens(lookup("DEV_TOKENS").as_deref().unwrap_or(""))?,
        })
    }

    /// Whether the server runs without Postgres.
    #[must_use]
    pub fn dev_mode(&self) -> bool {
        self.database_url.is_none()
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::Invalid { key, value: raw.clone(), reason: e.to_string() })
}

/// Channel capacities must be non-zero (`mpsc::channel(0)` panics).
fn parse_capacity<F>(lookup: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_var(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid { key, value: "0".into(), reason: "must be at least 1".into() });
    }
    Ok(value)
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: raw, reason: "expected a boolean".into() }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for entry in split_list(raw) {
        let Some((token, subject)) = entry.split_once('=') else {
            return Err(ConfigError::DevToken(entry));
        };
        let (token, subject) = (token.trim(), subject.trim());
        if token.is_empty() || subject.is_empty() {
            return Err(ConfigError::DevToken(entry));
        }
        tokens.insert(token.to_owned(), subject.to_owned());
    }
    Ok(tokens)
}
