//! Continue-or-stop decision taken after every cycle

use std::time::Duration;

use crate::protocol::ProgressReport;

/// Why a session stopped polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Reported chunk cursor reached `endGameChunkId`
    EndGameChunkReached,
    /// Observer reported `nextAvailableChunk == 0`
    NoNextChunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    /// Poll again after the delay
    Continue(Duration),
    /// Fetch end-of-game data and stop
    Terminate(TerminationReason),
}

/// Decide what follows a cycle.
///
/// `chunk_cursor` is the highest chunk id the observer *reported*, not the
/// highest one fetched, so a game can end with chunks still missing.
pub fn decide(report: &ProgressReport, chunk_cursor: u32, fallback_delay: Duration) -> CycleDecision {
    if report.has_end_game_chunk() && i64::from(chunk_cursor) == i64::from(report.end_game_chunk_id) {
        return CycleDecision::Terminate(TerminationReason::EndGameChunkReached);
    }

    match report.next_available_chunk {
        0 => CycleDecision::Terminate(TerminationReason::NoNextChunk),
        ms if ms < 1 => CycleDecision::Continue(fallback_delay),
        ms => CycleDecision::Continue(Duration::from_millis(ms as u64)),
    }
}
