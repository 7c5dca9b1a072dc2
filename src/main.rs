use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use stampede::{
    client::{FsObjectStore, HallLayoutStore, HttpTicketingClient},
    config::AppConfig,
    events::{ReleaseConsumer, ReleaseStream},
    logger::init_tracing,
    matches::MatchService,
    pool::BotPool,
    signal::ReleaseRegistry,
    time::now_ms,
};

/// Stand-in release stream that never yields a record.
struct IdleReleaseStream;

#[async_trait::async_trait]
impl ReleaseStream for IdleReleaseStream {
    async fn next_record(&mut self) -> Option<Vec<u8>> {
        // TODO: Replace with a Kafka consumer group over
        // cfg.event_stream (brokers/group_id/topic). Records are
        // BotDequeuedEvent JSON; redelivery after a crash is acceptable,
        // late signals are dropped by the registry.
        std::future::pending().await
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();

    let is_production = cfg.environment == "production";
    init_tracing(is_production, &cfg.log_level);

    tracing::info!("Starting stampede bot server...");

    let pool = Arc::new(BotPool::new(cfg.max_concurrent_bots));
    let registry = Arc::new(ReleaseRegistry::new());
    let ticketing = Arc::new(HttpTicketingClient::new(cfg.ticketing_api_url.clone())?);

    // TODO: Replace with the S3-compatible store configured by
    // cfg.object_store (endpoint/bucket/credentials); the key scheme is
    // identical.
    let layouts = Arc::new(HallLayoutStore::new(Arc::new(FsObjectStore::new("./data"))));

    let service = Arc::new(MatchService::new(
        pool,
        Arc::clone(&registry),
        ticketing,
        layouts,
        cfg.admission_grace,
        now_ms(),
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn(ReleaseConsumer::new(registry).run(IdleReleaseStream, shutdown.clone()));

    tracing::info!(
        port = cfg.server_port,
        ticketing_api = %cfg.ticketing_api_url,
        max_bots = cfg.max_concurrent_bots,
        "bot server running; waiting for shutdown signal"
    );

    wait_for_shutdown_signal().await?;
    tracing::info!("shutdown signal received");

    shutdown.cancel();
    service.begin_shutdown();

    // Give in-flight matches a bounded window to observe cancellation and
    // clean up before the process exits.
    let drained = async {
        while service.active_matches() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(5), drained).await.is_err() {
        tracing::warn!(
            remaining = service.active_matches(),
            "grace period elapsed; forcing exit"
        );
    }

    tracing::info!("bot server stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        out = tokio::signal::ctrl_c() => out?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    Ok(tokio::signal::ctrl_c().await?)
}
