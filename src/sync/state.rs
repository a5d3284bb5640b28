//! Per-session record of what has already been retrieved

use bitvec::prelude::*;
use parking_lot::Mutex;

use crate::error::ItemKind;
use crate::protocol::{GameIdentity, ProgressReport};

/// Append-only set of fetched ids, indexed directly by id
#[derive(Debug, Default)]
struct FetchedIds {
    bits: BitVec,
}

impl FetchedIds {
    fn contains(&self, id: u32) -> bool {
        self.bits.get(id as usize).map(|bit| *bit).unwrap_or(false)
    }

    /// Returns true if the id was newly inserted
    fn insert(&mut self, id: u32) -> bool {
        let idx = id as usize;
        if idx >= self.bits.len() {
            self.bits.resize(idx + 1, false);
        }
        !self.bits.replace(idx, true)
    }

    fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Ids in `[1, upto]` not yet fetched, ascending
    fn missing(&self, upto: u32) -> Vec<u32> {
        (1..=upto).filter(|&id| !self.contains(id)).collect()
    }
}

/// Session state owned by one synchronization loop.
///
/// Fetched sets only grow. Marking goes through a mutex so the fan-out
/// futures of a cycle can record their own ids; cursors are only touched
/// by the driver between cycles.
#[derive(Debug)]
pub struct SessionState {
    identity: GameIdentity,
    chunks: Mutex<FetchedIds>,
    key_frames: Mutex<FetchedIds>,
    highest_chunk_seen: u32,
    highest_key_frame_seen: u32,
}

impl SessionState {
    pub fn new(identity: GameIdentity) -> Self {
        Self {
            identity,
            chunks: Mutex::new(FetchedIds::default()),
            key_frames: Mutex::new(FetchedIds::default()),
            highest_chunk_seen: 0,
            highest_key_frame_seen: 0,
        }
    }

    pub fn identity(&self) -> &GameIdentity {
        &self.identity
    }

    pub fn mark_chunk_fetched(&self, id: u32) -> bool {
        self.chunks.lock().insert(id)
    }

    pub fn mark_key_frame_fetched(&self, id: u32) -> bool {
        self.key_frames.lock().insert(id)
    }

    pub fn is_chunk_fetched(&self, id: u32) -> bool {
        self.chunks.lock().contains(id)
    }

    pub fn is_key_frame_fetched(&self, id: u32) -> bool {
        self.key_frames.lock().contains(id)
    }

    pub fn mark_fetched(&self, kind: ItemKind, id: u32) -> bool {
        match kind {
            ItemKind::Chunk => self.mark_chunk_fetched(id),
            ItemKind::KeyFrame => self.mark_key_frame_fetched(id),
        }
    }

    pub fn fetched_chunk_count(&self) -> usize {
        self.chunks.lock().count()
    }

    pub fn fetched_key_frame_count(&self) -> usize {
        self.key_frames.lock().count()
    }

    pub(crate) fn missing_chunks(&self, upto: u32) -> Vec<u32> {
        self.chunks.lock().missing(upto)
    }

    pub(crate) fn missing_key_frames(&self, upto: u32) -> Vec<u32> {
        self.key_frames.lock().missing(upto)
    }

    /// Move the cursors to what the latest progress report announced
    pub fn observe(&mut self, report: &ProgressReport) {
        self.highest_chunk_seen = report.chunk_cursor();
        self.highest_key_frame_seen = report.key_frame_cursor();
    }

    pub fn highest_chunk_seen(&self) -> u32 {
        self.highest_chunk_seen
    }

    pub fn highest_key_frame_seen(&self) -> u32 {
        self.highest_key_frame_seen
    }
}
