//! Notifications pushed to whoever follows a session

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::SpectatorError;
use crate::protocol::ProgressReport;

/// Everything a session reports, in the order it happens.
/// `Chunk` and `KeyFrame` events of one cycle may interleave arbitrarily.
#[derive(Debug, Clone)]
pub enum SpectatorEvent {
    Version(String),
    Metadata(serde_json::Value),
    Progress(ProgressReport),
    Chunk { id: u32, payload: Bytes },
    KeyFrame { id: u32, payload: Bytes },
    EndOfGameStats(Bytes),
    End,
    Error(SpectatorError),
}

impl SpectatorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SpectatorEvent::Version(_) => "version",
            SpectatorEvent::Metadata(_) => "metadata",
            SpectatorEvent::Progress(_) => "progress",
            SpectatorEvent::Chunk { .. } => "chunk",
            SpectatorEvent::KeyFrame { .. } => "keyframe",
            SpectatorEvent::EndOfGameStats(_) => "endOfGameStats",
            SpectatorEvent::End => "end",
            SpectatorEvent::Error(_) => "error",
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<SpectatorEvent>;

/// Non-blocking sending half. A dropped receiver does not stop the session.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SpectatorEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: SpectatorEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            trace!("Dropping {} event, no receiver", name);
        }
    }
}
