//! Bearer credential verification for the websocket handshake.
//!
//! ARCHITECTURE
//! ============
//! Credential issuance lives outside this server. The handshake only needs
//! to map an opaque token to a subject id, so the check sits behind
//! [`Authenticator`]: Postgres sessions in production, a static token map
//! in dev mode and tests.
//!
//! Session rows store SHA-256 of the token so a leaked table cannot be
//! replayed as credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a bearer credential to a subject id. `Ok(None)` means the
    /// credential is unknown or expired.
    async fn authenticate(&self, credential: &str) -> Result<Option<String>, AuthError>;
}

/// Lowercase hex SHA-256 of a token, as stored in `sessions.token_hash`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
}

// =============================================================================
// STATIC
// =============================================================================

/// Fixed token → subject map.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticAuthenticator {
    #[must_use]
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Option<String>, AuthError> {
        Ok(self.tokens.get(credential).cloned())
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Looks tokens up in the `sessions` table.
#[derive(Clone)]
pub struct SessionAuthenticator {
    pool: PgPool,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Option<String>, AuthError> {
        if credential.is_empty() {
            return Ok(None);
        }
        let user_id: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM sessions WHERE token_hash = $1 AND expires_at > now()")
                .bind(hash_token(credential))
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }
}
