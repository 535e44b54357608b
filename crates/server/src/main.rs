//! herald server entry point.

mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use apalis::prelude::*;
use herald_common::{LivenessMonitor, Metrics, Settings};
use herald_core::platforms::{DiscordClient, TelegramClient, TwitterClient};
use herald_core::{DestinationRegistry, IndexerClient, PlatformClients};
use herald_queue::{
    Dispatcher, JobContext, QueueName, RedisQueue, WorkerConfig, bootstrap, job_worker,
};
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Grace period for in-flight jobs once shutdown begins.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "herald=info,tower_http=info".into());
    let json = std::env::var("HERALD_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting herald...");

    // Load configuration
    let settings = Settings::load().context("failed to load settings")?;
    let registry = DestinationRegistry::load(&settings.destinations_path)
        .with_context(|| format!("failed to load {}", settings.destinations_path.display()))?;
    info!(destinations = registry.len(), "Loaded destination registry");

    // Platform and indexer clients
    let timeout = Duration::from_secs(settings.delivery.timeout_secs);
    let clients = PlatformClients {
        discord: Arc::new(DiscordClient::new(
            timeout,
            settings.delivery.discord_max_length,
        )?),
        telegram: Arc::new(TelegramClient::new(timeout)?),
        twitter: Arc::new(TwitterClient::new(timeout)?),
    };
    let source = Arc::new(IndexerClient::new(
        settings.indexer.url.clone(),
        Duration::from_secs(settings.indexer.timeout_secs),
        settings.indexer.page_size,
    )?);

    // Connect to Redis and initialize job queues
    info!("Connecting to Redis...");
    let redis_client =
        redis::Client::open(settings.redis.url.as_str()).context("invalid Redis URL")?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("failed to connect to Redis")?;
    let queue = RedisQueue::new(redis_conn, &settings.redis.prefix);
    info!(prefix = %settings.redis.prefix, "Connected to Redis job queue");

    let metrics = Arc::new(Metrics::new());
    let liveness = Arc::new(LivenessMonitor::new());
    let ctx = JobContext {
        dispatcher: Dispatcher::new(Arc::new(queue.clone()), metrics.clone()),
        source,
        registry: Arc::new(registry),
        clients,
        config: Arc::new(WorkerConfig::from_settings(&settings)),
        liveness: liveness.clone(),
        metrics: metrics.clone(),
    };

    bootstrap(&ctx)
        .await
        .context("failed to seed polling streams")?;
    info!("Polling streams seeded");

    // One worker per queue
    let mut monitor = Monitor::new().shutdown_timeout(WORKER_SHUTDOWN_TIMEOUT);
    for name in QueueName::ALL {
        monitor = monitor.register(
            WorkerBuilder::new(name.as_str())
                .data(ctx.clone())
                .backend(queue.storage(name)?)
                .build_fn(job_worker),
        );
    }

    let (stop_tx, mut stop_rx) = watch::channel(());
    let workers = tokio::spawn(async move {
        let stop = async move {
            let _ = stop_rx.changed().await;
            Ok::<(), std::io::Error>(())
        };
        if let Err(e) = monitor.run_with_signal(stop).await {
            error!(error = %e, "Job workers failed");
        }
    });
    info!(queues = QueueName::ALL.len(), "Job workers started");

    // Jobs the queue refused are resubmitted until it accepts them
    let redelivery = ctx.dispatcher.clone();
    let period = ctx.config.jobs.redelivery_interval().max(Duration::from_secs(1));
    let redeliver = tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            redelivery.redeliver_stranded().await;
        }
    });

    // Health and metrics endpoints
    let app = health::router(health::OpsState { liveness, metrics })
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining job workers...");
    stop_tx.send_replace(());
    if let Err(e) = workers.await {
        error!(error = %e, "Job worker task panicked");
    }
    redeliver.abort();
    ctx.dispatcher.redeliver_stranded().await;
    let stranded = ctx.dispatcher.stranded_len().await;
    if stranded > 0 {
        error!(stranded, "Exiting with jobs the queue never accepted");
    }

    info!("Server shutdown complete");
    Ok(())
}
