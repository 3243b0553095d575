//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Route handlers translate protocol; everything else lives here. The
//! relay routes envelopes using the connection registry, the room store
//! and the persistence worker. Auth and storage are trait seams so dev
//! mode and tests run without Postgres.

pub mod auth;
pub mod persistence;
pub mod pg_store;
pub mod registry;
pub mod relay;
pub mod store;
