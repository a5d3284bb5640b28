//! Settle-all fan-out of one cycle's pending fetches

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ItemFailure, ItemKind, SpectatorError};
use crate::gateway::FetchGateway;
use crate::metrics::SyncMetrics;
use crate::protocol::Endpoint;

use super::events::{EventSender, SpectatorEvent};
use super::scheduler::PendingIds;
use super::state::SessionState;

/// Per-cycle outcome, ids ascending within each list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub fetched_chunks: Vec<u32>,
    pub failed_chunks: Vec<u32>,
    pub fetched_key_frames: Vec<u32>,
    pub failed_key_frames: Vec<u32>,
}

impl CycleSummary {
    pub fn attempted(&self) -> usize {
        self.fetched_chunks.len()
            + self.failed_chunks.len()
            + self.fetched_key_frames.len()
            + self.failed_key_frames.len()
    }

    pub fn failures(&self) -> usize {
        self.failed_chunks.len() + self.failed_key_frames.len()
    }
}

struct ItemOutcome {
    kind: ItemKind,
    id: u32,
    fetched: bool,
}

/// Issues one GET per pending id and waits for all of them.
///
/// Every future runs to completion; a failed id is reported and left
/// unmarked so the next scheduler pass picks it up again.
pub struct FetchExecutor<'a> {
    gateway: &'a dyn FetchGateway,
    state: &'a SessionState,
    events: &'a EventSender,
    metrics: &'a SyncMetrics,
    limiter: Option<Semaphore>,
}

impl<'a> FetchExecutor<'a> {
    pub fn new(
        gateway: &'a dyn FetchGateway,
        state: &'a SessionState,
        events: &'a EventSender,
        metrics: &'a SyncMetrics,
    ) -> Self {
        Self {
            gateway,
            state,
            events,
            metrics,
            limiter: None,
        }
    }

    /// Limit simultaneous fetches (0 = unbounded)
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.limiter = (max > 0).then(|| Semaphore::new(max));
        self
    }

    pub async fn run(&self, pending: &PendingIds) -> CycleSummary {
        let chunk_fetches = pending
            .chunks
            .iter()
            .map(|&id| self.fetch_item(ItemKind::Chunk, id));
        let key_frame_fetches = pending
            .key_frames
            .iter()
            .map(|&id| self.fetch_item(ItemKind::KeyFrame, id));

        let outcomes = join_all(chunk_fetches.chain(key_frame_fetches)).await;

        let mut summary = CycleSummary::default();
        for outcome in outcomes {
            let list = match (outcome.kind, outcome.fetched) {
                (ItemKind::Chunk, true) => &mut summary.fetched_chunks,
                (ItemKind::Chunk, false) => &mut summary.failed_chunks,
                (ItemKind::KeyFrame, true) => &mut summary.fetched_key_frames,
                (ItemKind::KeyFrame, false) => &mut summary.failed_key_frames,
            };
            list.push(outcome.id);
        }
        summary
    }

    async fn fetch_item(&self, kind: ItemKind, id: u32) -> ItemOutcome {
        let _permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        let endpoint = match kind {
            ItemKind::Chunk => Endpoint::GameDataChunk(id),
            ItemKind::KeyFrame => Endpoint::KeyFrame(id),
        };
        let url = self.state.identity().url(endpoint);

        let reason = match self.gateway.fetch(&url).await {
            Ok(response) if response.is_ok() => {
                self.state.mark_fetched(kind, id);
                self.metrics.record_item_fetched(kind, response.body.len());
                debug!("Fetched {} {} ({} bytes)", kind, id, response.body.len());

                let payload = response.body;
                self.events.emit(match kind {
                    ItemKind::Chunk => SpectatorEvent::Chunk { id, payload },
                    ItemKind::KeyFrame => SpectatorEvent::KeyFrame { id, payload },
                });
                return ItemOutcome { kind, id, fetched: true };
            }
            Ok(response) => ItemFailure::Status(response.status),
            Err(e) => ItemFailure::Transport(e),
        };

        warn!("{} {} unavailable: {}", kind, id, reason);
        self.metrics.record_item_failed(kind);
        self.events.emit(SpectatorEvent::Error(SpectatorError::ItemFetch {
            kind,
            id,
            game: self.state.identity().key(),
            reason,
        }));

        ItemOutcome { kind, id, fetched: false }
    }
}
