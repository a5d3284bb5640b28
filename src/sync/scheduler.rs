//! Works out which ids a cycle still has to fetch

use tracing::warn;

use crate::protocol::ProgressReport;

use super::state::SessionState;

/// Ids missing after the latest progress report, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingIds {
    pub chunks: Vec<u32>,
    pub key_frames: Vec<u32>,
}

impl PendingIds {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.key_frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len() + self.key_frames.len()
    }
}

/// Highest id a single cycle will schedule; a game runs far below this
pub const MAX_SCHEDULED_ID: u32 = 100_000;

/// Every chunk in `[1, chunkId]` and keyframe in `[1, keyFrameId]` not yet fetched.
///
/// Cursors above [`MAX_SCHEDULED_ID`] are clamped.
pub fn pending(report: &ProgressReport, state: &SessionState) -> PendingIds {
    PendingIds {
        chunks: state.missing_chunks(clamp("chunk", report.chunk_cursor())),
        key_frames: state.missing_key_frames(clamp("keyframe", report.key_frame_cursor())),
    }
}

fn clamp(kind: &str, cursor: u32) -> u32 {
    if cursor > MAX_SCHEDULED_ID {
        warn!("Reported {} id {} exceeds {}, clamping", kind, cursor, MAX_SCHEDULED_ID);
        MAX_SCHEDULED_ID
    } else {
        cursor
    }
}
