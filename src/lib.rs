//! Replay Spectator Library
//!
//! Follows a live game on a replay observer server, pulling chunks and
//! keyframes as they appear and the end-of-game stats once the match is over.
//!
//! # Features
//!
//! - `http` - reqwest-backed observer gateway and the `replay-spectator` binary (enabled by default)

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod protocol;
pub mod sync;

pub use error::{GatewayError, ItemFailure, ItemKind, SpectatorError};
pub use protocol::{GameIdentity, ObserverCredentials, ProgressReport};
pub use sync::{SessionHandle, SessionOutcome, SpectatorEvent, SpectatorSession};
