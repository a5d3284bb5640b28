//! Prometheus-compatible metrics endpoint
//!
//! Counters for every session run by this process.
//! Default endpoint: http://localhost:{METRICS_PORT}/metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::ItemKind;

/// Metrics registry for spectator sessions
#[derive(Debug)]
pub struct SyncMetrics {
    // Sessions
    pub sessions_active: AtomicU64,
    pub sessions_ended: AtomicU64,
    pub sessions_failed: AtomicU64,
    pub sessions_cancelled: AtomicU64,

    // Polling
    pub cycles: AtomicU64,
    pub last_delay_ms: AtomicU64,

    // Items
    pub chunks_fetched: AtomicU64,
    pub chunks_failed: AtomicU64,
    pub key_frames_fetched: AtomicU64,
    pub key_frames_failed: AtomicU64,
    pub bytes_received: AtomicU64,

    start_time: Instant,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            sessions_active: AtomicU64::new(0),
            sessions_ended: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            sessions_cancelled: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
            last_delay_ms: AtomicU64::new(0),
            chunks_fetched: AtomicU64::new(0),
            chunks_failed: AtomicU64::new(0),
            key_frames_fetched: AtomicU64::new(0),
            key_frames_failed: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_item_fetched(&self, kind: ItemKind, bytes: usize) {
        match kind {
            ItemKind::Chunk => self.chunks_fetched.fetch_add(1, Ordering::Relaxed),
            ItemKind::KeyFrame => self.key_frames_fetched.fetch_add(1, Ordering::Relaxed),
        };
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_item_failed(&self, kind: ItemKind) {
        match kind {
            ItemKind::Chunk => self.chunks_failed.fetch_add(1, Ordering::Relaxed),
            ItemKind::KeyFrame => self.key_frames_failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delay(&self, delay: Duration) {
        self.last_delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn session_started(&self) {
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Moves one session from active to the given terminal counter
    pub fn session_finished(&self, terminal: &AtomicU64) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
        terminal.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("replay_spectator_sessions_active", "Sessions currently polling", "gauge",
            self.sessions_active.load(Ordering::Relaxed));
        metric!("replay_spectator_sessions_ended_total", "Sessions that reached end of game", "counter",
            self.sessions_ended.load(Ordering::Relaxed));
        metric!("replay_spectator_sessions_failed_total", "Sessions aborted by a fatal error", "counter",
            self.sessions_failed.load(Ordering::Relaxed));
        metric!("replay_spectator_sessions_cancelled_total", "Sessions cancelled by the caller", "counter",
            self.sessions_cancelled.load(Ordering::Relaxed));

        metric!("replay_spectator_cycles_total", "Polling cycles completed", "counter",
            self.cycles.load(Ordering::Relaxed));
        metric!("replay_spectator_last_delay_milliseconds", "Most recent inter-cycle delay", "gauge",
            self.last_delay_ms.load(Ordering::Relaxed));

        metric!("replay_spectator_chunks_fetched_total", "Chunks retrieved", "counter",
            self.chunks_fetched.load(Ordering::Relaxed));
        metric!("replay_spectator_chunks_failed_total", "Chunk fetch failures", "counter",
            self.chunks_failed.load(Ordering::Relaxed));
        metric!("replay_spectator_keyframes_fetched_total", "Keyframes retrieved", "counter",
            self.key_frames_fetched.load(Ordering::Relaxed));
        metric!("replay_spectator_keyframes_failed_total", "Keyframe fetch failures", "counter",
            self.key_frames_failed.load(Ordering::Relaxed));
        metric!("replay_spectator_bytes_received_total", "Chunk and keyframe payload bytes", "counter",
            self.bytes_received.load(Ordering::Relaxed));

        metric!("replay_spectator_uptime_seconds", "Process uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "sessions": {
                "active": self.sessions_active.load(Ordering::Relaxed),
                "ended": self.sessions_ended.load(Ordering::Relaxed),
                "failed": self.sessions_failed.load(Ordering::Relaxed),
                "cancelled": self.sessions_cancelled.load(Ordering::Relaxed),
            },
            "polling": {
                "cycles": self.cycles.load(Ordering::Relaxed),
                "last_delay_ms": self.last_delay_ms.load(Ordering::Relaxed),
            },
            "items": {
                "chunks_fetched": self.chunks_fetched.load(Ordering::Relaxed),
                "chunks_failed": self.chunks_failed.load(Ordering::Relaxed),
                "keyframes_fetched": self.key_frames_fetched.load(Ordering::Relaxed),
                "keyframes_failed": self.key_frames_failed.load(Ordering::Relaxed),
                "bytes_received": self.bytes_received.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<SyncMetrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = render_response(&metrics, &request);

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

fn render_response(metrics: &SyncMetrics, request: &str) -> String {
    // "/metrics/json" must be checked before the "/metrics" prefix
    let (content_type, body) = if request.starts_with("GET /metrics/json")
        || request.starts_with("GET /json")
    {
        ("application/json", metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        ("text/plain; version=0.0.4", metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        ("text/plain", "OK".to_string())
    } else {
        return "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
    };

    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}
