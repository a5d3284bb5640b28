//! Scripted in-memory observer used by the engine tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{GatewayError, ItemKind};
use crate::gateway::{FetchGateway, FetchResponse};
use crate::protocol::ProgressReport;

enum Failure {
    Status { remaining: usize },
    Transport,
}

/// Answers observer URLs from a script and records every call.
///
/// Progress reports are served in order; the last one repeats forever.
pub struct ScriptedGateway {
    reports: Mutex<VecDeque<ProgressReport>>,
    metadata_status: u16,
    stats_status: u16,
    item_latency: Option<Duration>,
    stats_latency: Option<Duration>,
    failures: Mutex<HashMap<(ItemKind, u32), Failure>>,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(VecDeque::new()),
            metadata_status: 200,
            stats_status: 200,
            item_latency: None,
            stats_latency: None,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_reports(self, reports: Vec<ProgressReport>) -> Self {
        *self.reports.lock() = reports.into();
        self
    }

    pub fn with_metadata_status(mut self, status: u16) -> Self {
        self.metadata_status = status;
        self
    }

    pub fn with_stats_status(mut self, status: u16) -> Self {
        self.stats_status = status;
        self
    }

    pub fn with_item_latency(mut self, latency: Duration) -> Self {
        self.item_latency = Some(latency);
        self
    }

    pub fn with_stats_latency(mut self, latency: Duration) -> Self {
        self.stats_latency = Some(latency);
        self
    }

    /// Answer 404 for the item the next `times` requests
    pub fn fail_item(&self, kind: ItemKind, id: u32, times: usize) {
        self.failures
            .lock()
            .insert((kind, id), Failure::Status { remaining: times });
    }

    /// Fail the item with a transport error on every request
    pub fn fail_item_with_transport(&self, kind: ItemKind, id: u32) {
        self.failures.lock().insert((kind, id), Failure::Transport);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Instants of every call whose URL contains `fragment`
    pub fn call_times(&self, fragment: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(url, _)| url.contains(fragment))
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.call_times(fragment).len()
    }

    /// Ids requested for one item kind, in request order
    pub fn item_requests(&self, kind: ItemKind) -> Vec<u32> {
        let fragment = item_fragment(kind);
        self.calls
            .lock()
            .iter()
            .filter(|(url, _)| url.contains(fragment))
            .filter_map(|(url, _)| item_id(url))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_report(&self) -> ProgressReport {
        let mut reports = self.reports.lock();
        if reports.len() > 1 {
            reports.pop_front().unwrap_or_default()
        } else {
            reports.front().cloned().unwrap_or_default()
        }
    }

    async fn item(&self, kind: ItemKind, url: &str) -> Result<FetchResponse, GatewayError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.item_latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = item_id(url).unwrap_or_default();
        {
            let mut failures = self.failures.lock();
            match failures.get_mut(&(kind, id)) {
                Some(Failure::Transport) => {
                    return Err(GatewayError::Request("connection reset".to_string()));
                }
                Some(Failure::Status { remaining }) if *remaining > 0 => {
                    *remaining = remaining.saturating_sub(1);
                    return Ok(FetchResponse::new(404, ""));
                }
                _ => {}
            }
        }

        Ok(FetchResponse::new(200, format!("{}-{}", kind, id)))
    }
}

#[async_trait]
impl FetchGateway for ScriptedGateway {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, GatewayError> {
        self.calls.lock().push((url.to_string(), Instant::now()));

        if url.ends_with("/version") {
            Ok(FetchResponse::new(200, "2.0.0"))
        } else if url.contains("/getGameMetaData/") {
            Ok(FetchResponse::new(self.metadata_status, r#"{"gameKey":{"gameId":4242}}"#))
        } else if url.contains("/getLastChunkInfo/") {
            let body = serde_json::to_vec(&self.next_report())
                .map_err(|e| GatewayError::Body(e.to_string()))?;
            Ok(FetchResponse::new(200, body))
        } else if url.contains(item_fragment(ItemKind::Chunk)) {
            self.item(ItemKind::Chunk, url).await
        } else if url.contains(item_fragment(ItemKind::KeyFrame)) {
            self.item(ItemKind::KeyFrame, url).await
        } else if url.contains("/endOfGameStats/") {
            if let Some(latency) = self.stats_latency {
                tokio::time::sleep(latency).await;
            }
            Ok(FetchResponse::new(self.stats_status, "stats"))
        } else {
            Ok(FetchResponse::new(404, ""))
        }
    }
}

fn item_fragment(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Chunk => "/getGameDataChunk/",
        ItemKind::KeyFrame => "/getKeyFrame/",
    }
}

/// `.../{id}/token` -> id
fn item_id(url: &str) -> Option<u32> {
    url.rsplit('/').nth(1)?.parse().ok()
}

pub fn report(chunk_id: i32, key_frame_id: i32, next_available_chunk: i64, end_game_chunk_id: i32) -> ProgressReport {
    ProgressReport {
        chunk_id,
        key_frame_id,
        next_available_chunk,
        end_game_chunk_id,
        ..Default::default()
    }
}
