//! Synchronization loop driving one spectated game to completion

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SpectatorConfig;
use crate::error::SpectatorError;
use crate::gateway::FetchGateway;
use crate::metrics::SyncMetrics;
use crate::protocol::{Endpoint, GameIdentity, ProgressReport};

use super::events::{EventReceiver, EventSender, SpectatorEvent};
use super::executor::FetchExecutor;
use super::scheduler;
use super::state::SessionState;
use super::termination::{self, CycleDecision};

/// Driver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Start,
    MetadataFetched,
    Polling,
    Ending,
    Terminated,
}

/// How a session that did not fail came to a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// End-of-game data fetched and `End` emitted
    Ended,
    /// Cancelled by the caller; no `End` is emitted
    Cancelled,
}

/// One spectated game.
///
/// Running the session consumes it, so state is never reused across games.
/// Each cycle fully settles its fan-out before the next progress report is
/// requested.
pub struct SpectatorSession {
    gateway: Arc<dyn FetchGateway>,
    state: SessionState,
    config: SpectatorConfig,
    events: EventSender,
    metrics: Arc<SyncMetrics>,
    cancel: CancellationToken,
    phase: SessionPhase,
}

impl SpectatorSession {
    /// Create a session and the receiver its notifications go to
    pub fn new(
        identity: GameIdentity,
        gateway: Arc<dyn FetchGateway>,
        config: SpectatorConfig,
    ) -> (Self, EventReceiver) {
        let (events, rx) = EventSender::channel();
        let session = Self {
            gateway,
            state: SessionState::new(identity),
            config,
            events,
            metrics: Arc::new(SyncMetrics::new()),
            cancel: CancellationToken::new(),
            phase: SessionPhase::Start,
        };
        (session, rx)
    }

    /// Report into a shared metrics registry
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Token that stops the session once its in-flight requests settle
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn identity(&self) -> &GameIdentity {
        self.state.identity()
    }

    /// Run on the tokio runtime
    pub fn spawn(self) -> SessionHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        SessionHandle { cancel, task }
    }

    /// Drive the session until the game ends, it is cancelled, or a fatal error occurs.
    ///
    /// Fatal errors are also emitted as an `Error` event before returning.
    pub async fn run(mut self) -> Result<SessionOutcome, SpectatorError> {
        let key = self.state.identity().key();
        info!("Spectating game {}", key);
        self.metrics.session_started();

        let result = self.drive().await;
        self.transition(SessionPhase::Terminated);

        match &result {
            Ok(SessionOutcome::Ended) => {
                info!(
                    "Game {} ended: {} chunks, {} keyframes",
                    key,
                    self.state.fetched_chunk_count(),
                    self.state.fetched_key_frame_count()
                );
                self.metrics.session_finished(&self.metrics.sessions_ended);
            }
            Ok(SessionOutcome::Cancelled) => {
                info!("Spectating game {} cancelled", key);
                self.metrics.session_finished(&self.metrics.sessions_cancelled);
            }
            Err(e) => {
                error!("Spectating game {} failed: {}", key, e);
                self.events.emit(SpectatorEvent::Error(e.clone()));
                self.metrics.session_finished(&self.metrics.sessions_failed);
            }
        }

        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome, SpectatorError> {
        if self.cancel.is_cancelled() {
            return Ok(SessionOutcome::Cancelled);
        }

        if self.config.fetch_version {
            self.fetch_version().await;
        }

        let metadata = self.fetch_json::<serde_json::Value>(Endpoint::GameMetaData).await?;
        self.events.emit(SpectatorEvent::Metadata(metadata));
        self.transition(SessionPhase::MetadataFetched);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(SessionOutcome::Cancelled);
            }

            self.transition(SessionPhase::Polling);
            let cycle_start = Instant::now();

            let report = self.fetch_json::<ProgressReport>(Endpoint::LastChunkInfo).await?;
            self.events.emit(SpectatorEvent::Progress(report.clone()));
            self.state.observe(&report);

            let pending = scheduler::pending(&report, &self.state);
            let summary = FetchExecutor::new(
                self.gateway.as_ref(),
                &self.state,
                &self.events,
                &self.metrics,
            )
            .with_max_concurrent(self.config.max_concurrent_fetches)
            .run(&pending)
            .await;
            self.metrics.record_cycle();

            debug!(
                "Cycle: chunk {}/{} keyframe {}, fetched {} of {} ({} failed)",
                report.chunk_id,
                report.end_game_chunk_id,
                report.key_frame_id,
                summary.attempted() - summary.failures(),
                pending.len(),
                summary.failures()
            );

            if self.cancel.is_cancelled() {
                return Ok(SessionOutcome::Cancelled);
            }

            let decision = termination::decide(
                &report,
                self.state.highest_chunk_seen(),
                self.config.fallback_delay,
            );
            match decision {
                CycleDecision::Terminate(reason) => {
                    info!("Game {} finished ({:?})", self.state.identity().key(), reason);
                    break;
                }
                CycleDecision::Continue(delay) => {
                    let delay = if self.config.compensate_cycle_time {
                        delay.saturating_sub(cycle_start.elapsed())
                    } else {
                        delay
                    };
                    self.metrics.record_delay(delay);
                    debug!("Next cycle in {:?}", delay);

                    tokio::select! {
                        _ = self.cancel.cancelled() => return Ok(SessionOutcome::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.transition(SessionPhase::Ending);

        let (stats, metadata) = tokio::try_join!(
            self.fetch_required(Endpoint::EndOfGameStats),
            self.fetch_json::<serde_json::Value>(Endpoint::GameMetaData),
        )?;
        if self.cancel.is_cancelled() {
            return Ok(SessionOutcome::Cancelled);
        }
        self.events.emit(SpectatorEvent::EndOfGameStats(stats));
        self.events.emit(SpectatorEvent::Metadata(metadata));
        self.events.emit(SpectatorEvent::End);

        Ok(SessionOutcome::Ended)
    }

    /// Version is diagnostic only; failures are logged and ignored
    async fn fetch_version(&self) {
        let url = self.state.identity().url(Endpoint::Version);
        match self.gateway.fetch(&url).await {
            Ok(response) if response.is_success() => {
                let version = String::from_utf8_lossy(&response.body).trim().to_string();
                debug!("Observer version {}", version);
                self.events.emit(SpectatorEvent::Version(version));
            }
            Ok(response) => warn!("Observer version request returned HTTP {}", response.status),
            Err(e) => warn!("Observer version request failed: {}", e),
        }
    }

    /// GET an endpoint that must answer 200
    async fn fetch_required(&self, endpoint: Endpoint) -> Result<Bytes, SpectatorError> {
        let url = self.state.identity().url(endpoint);
        let response = self
            .gateway
            .fetch(&url)
            .await
            .map_err(|source| SpectatorError::Transport {
                endpoint: endpoint.name(),
                game: self.state.identity().key(),
                source,
            })?;

        if !response.is_ok() {
            return Err(SpectatorError::Status {
                endpoint: endpoint.name(),
                game: self.state.identity().key(),
                status: response.status,
            });
        }

        Ok(response.body)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, SpectatorError> {
        let body = self.fetch_required(endpoint).await?;
        serde_json::from_slice(&body).map_err(|e| SpectatorError::Decode {
            endpoint: endpoint.name(),
            game: self.state.identity().key(),
            message: e.to_string(),
        })
    }

    fn transition(&mut self, next: SessionPhase) {
        if self.phase != next {
            debug!("Session {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }
}

/// Handle to a spawned session
pub struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<SessionOutcome, SpectatorError>>,
}

impl SessionHandle {
    /// Stop once the in-flight requests settle
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to terminate
    pub async fn join(self) -> Result<SessionOutcome, SpectatorError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SpectatorError::Aborted(e.to_string())),
        }
    }
}
