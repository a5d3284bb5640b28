use std::sync::Arc;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use replay_spectator::config::{SpectatorConfig, TargetConfig};
use replay_spectator::gateway::HttpGateway;
use replay_spectator::metrics::{self, SyncMetrics};
use replay_spectator::{SpectatorEvent, SpectatorSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Replay Spectator v{}", env!("CARGO_PKG_VERSION"));

    let config = SpectatorConfig::load_or_default();
    config.validate()?;
    let target = TargetConfig::from_env()?;
    let identity = target.identity();
    info!(
        "Following game {} via {} (fallback delay {:?})",
        identity.key(),
        identity.base_url(),
        config.fallback_delay
    );

    let metrics = Arc::new(SyncMetrics::new());
    if let Some(port) = config.metrics_port {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let gateway = Arc::new(HttpGateway::new(config.request_timeout)?);
    let (session, mut events) = SpectatorSession::new(identity, gateway, config);
    let handle = session.with_metrics(metrics).spawn();

    // Ctrl+C stops polling once the current cycle has settled
    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        match event {
            SpectatorEvent::Version(version) => info!("Observer version {}", version),
            SpectatorEvent::Metadata(_) => info!("Game metadata received"),
            SpectatorEvent::Progress(report) => debug!(
                "Progress: chunk {} keyframe {} next in {}ms",
                report.chunk_id, report.key_frame_id, report.next_available_chunk
            ),
            SpectatorEvent::Chunk { id, payload } => info!("Chunk {} ({} bytes)", id, payload.len()),
            SpectatorEvent::KeyFrame { id, payload } => {
                info!("Keyframe {} ({} bytes)", id, payload.len())
            }
            SpectatorEvent::EndOfGameStats(stats) => {
                info!("End of game stats ({} bytes)", stats.len())
            }
            SpectatorEvent::End => info!("Game over"),
            SpectatorEvent::Error(e) if e.is_fatal() => error!("{}", e),
            SpectatorEvent::Error(e) => warn!("{}", e),
        }
    }

    let outcome = handle.join().await?;
    info!("Session finished: {:?}", outcome);

    Ok(())
}
