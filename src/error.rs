//! Error types
//!
//! Everything here is `Clone` so errors can travel through the event channel.

use std::fmt;

use crate::protocol::GameKey;

/// Failure of the transport itself (no HTTP status was obtained)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Kind of replay item fetched during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Chunk,
    KeyFrame,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Chunk => f.write_str("chunk"),
            ItemKind::KeyFrame => f.write_str("keyframe"),
        }
    }
}

/// Why a single chunk or keyframe fetch failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemFailure {
    #[error("HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] GatewayError),
}

/// Session errors
///
/// `ItemFetch` is transient: the session keeps polling and the id is retried
/// on the next cycle. Every other variant ends the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpectatorError {
    #[error("Failed to fetch {endpoint} for GameKey {game}: {source}")]
    Transport {
        endpoint: &'static str,
        game: GameKey,
        #[source]
        source: GatewayError,
    },
    #[error("No {endpoint} found for GameKey {game} (HTTP {status})")]
    Status {
        endpoint: &'static str,
        game: GameKey,
        status: u16,
    },
    #[error("Invalid {endpoint} payload for GameKey {game}: {message}")]
    Decode {
        endpoint: &'static str,
        game: GameKey,
        message: String,
    },
    #[error("{kind} {id} not available on server for GameKey {game}: {reason}")]
    ItemFetch {
        kind: ItemKind,
        id: u32,
        game: GameKey,
        reason: ItemFailure,
    },
    #[error("Session task aborted: {0}")]
    Aborted(String),
}

impl SpectatorError {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SpectatorError::ItemFetch { .. })
    }
}
