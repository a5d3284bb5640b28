//! Observer REST protocol
//!
//! Endpoint layout and payload types for the replay observer service.
//! Every request is a plain GET under
//! `http://{address}:{port}/observer-mode/rest/consumer`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path prefix shared by every observer endpoint
pub const CONSUMER_PATH: &str = "/observer-mode/rest/consumer";

/// Fixed parameter the observer expects on `getLastChunkInfo`
pub const LAST_CHUNK_INFO_PARAM: u32 = 30_000;

/// Observer credentials as handed out by the platform's spectator API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverCredentials {
    pub game_id: u64,
    pub game_server_address: String,
    pub observer_server_port: u16,
}

/// Short platform/game key used in error messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameKey {
    pub platform_id: String,
    pub game_id: u64,
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.game_id, self.platform_id)
    }
}

/// Immutable coordinates of a spectated game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    platform_id: String,
    game_id: u64,
    base_url: String,
}

impl GameIdentity {
    pub fn new(
        platform_id: impl Into<String>,
        game_id: u64,
        server_address: &str,
        observer_port: u16,
    ) -> Self {
        Self {
            platform_id: platform_id.into(),
            game_id,
            base_url: format!("http://{}:{}{}", server_address, observer_port, CONSUMER_PATH),
        }
    }

    /// Build an identity from observer credentials
    pub fn from_credentials(platform_id: impl Into<String>, credentials: &ObserverCredentials) -> Self {
        Self::new(
            platform_id,
            credentials.game_id,
            &credentials.game_server_address,
            credentials.observer_server_port,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn key(&self) -> GameKey {
        GameKey {
            platform_id: self.platform_id.clone(),
            game_id: self.game_id,
        }
    }

    /// Full URL for an endpoint of this game
    pub fn url(&self, endpoint: Endpoint) -> String {
        let (platform, game) = (&self.platform_id, self.game_id);
        let path = match endpoint {
            Endpoint::Version => "/version".to_string(),
            Endpoint::GameMetaData => format!("/getGameMetaData/{}/{}/0/token", platform, game),
            Endpoint::LastChunkInfo => format!(
                "/getLastChunkInfo/{}/{}/{}/token",
                platform, game, LAST_CHUNK_INFO_PARAM
            ),
            Endpoint::GameDataChunk(id) => {
                format!("/getGameDataChunk/{}/{}/{}/token", platform, game, id)
            }
            Endpoint::KeyFrame(id) => format!("/getKeyFrame/{}/{}/{}/token", platform, game, id),
            Endpoint::EndOfGameStats => format!("/endOfGameStats/{}/{}/token", platform, game),
        };
        format!("{}{}", self.base_url, path)
    }
}

/// Observer endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Version,
    GameMetaData,
    LastChunkInfo,
    GameDataChunk(u32),
    KeyFrame(u32),
    EndOfGameStats,
}

impl Endpoint {
    /// Human-readable endpoint name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Version => "version",
            Endpoint::GameMetaData => "game metadata",
            Endpoint::LastChunkInfo => "last chunk info",
            Endpoint::GameDataChunk(_) => "game data chunk",
            Endpoint::KeyFrame(_) => "keyframe",
            Endpoint::EndOfGameStats => "end of game stats",
        }
    }
}

/// Server-side progress of a live game (`getLastChunkInfo`)
///
/// Ids are signed on the wire; the observer uses zero and negative values
/// as "nothing yet" markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// Highest chunk id available on the server
    #[serde(default)]
    pub chunk_id: i32,
    /// Highest keyframe id available on the server
    #[serde(default)]
    pub key_frame_id: i32,
    /// Milliseconds until the next chunk is expected (negative = unknown)
    #[serde(default)]
    pub next_available_chunk: i64,
    /// Chunk id at which the game ends (0 = still running)
    #[serde(default)]
    pub end_game_chunk_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_since: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chunk_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_startup_chunk_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_game_chunk_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl ProgressReport {
    /// Highest reported chunk id, clamped to zero
    pub fn chunk_cursor(&self) -> u32 {
        self.chunk_id.max(0) as u32
    }

    /// Highest reported keyframe id, clamped to zero
    pub fn key_frame_cursor(&self) -> u32 {
        self.key_frame_id.max(0) as u32
    }

    /// Whether the observer has announced the end-game chunk
    pub fn has_end_game_chunk(&self) -> bool {
        self.end_game_chunk_id > 0
    }
}
