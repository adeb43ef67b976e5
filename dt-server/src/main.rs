//! Dragon-Tiger Wagering Server
//!
//! Transactional wagering backend for a Dragon-Tiger card game: bet
//! placement with layered idempotency, draw settlement, round lifecycle,
//! and a transactional outbox feeding a message bus.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use dt_core::bus::MemoryBus;
use dt_core::framework::DatabaseProcessor;
use dt_core::kv::{DisabledKv, KvStore, RedisKv};
use dt_core::processors::{InboxConsumer, InboxConsumerConfig, OutboxDispatcher};
use dt_core::services::{BetService, DrawService, LifecycleService, RoundQueryService};
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Dragon-Tiger wagering backend
#[derive(Parser, Debug)]
#[command(name = "dt-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./dt-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

/// The running background pipeline: outbox dispatcher + inbox consumer.
struct Pipeline {
    /// Shutdown signal sender -- set to `true` to stop all processors.
    shutdown_tx: watch::Sender<bool>,
    /// Join handles for all spawned processor tasks.
    join_handles: Vec<JoinHandle<()>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting dt-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let file_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = file_config.server.listen;

    let database_url = config::database_url(&file_config).inspect_err(|e| {
        tracing::error!("No database URL available: {e}");
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(file_config.database.max_connections)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // KV is a latency layer only: no Redis (or a failed connect) means
    // the engines run in degraded mode with SQL as the sole authority.
    let kv: Arc<dyn KvStore> = if file_config.redis.url.is_empty() {
        tracing::warn!("No Redis configured; KV layer disabled");
        Arc::new(DisabledKv)
    } else {
        match RedisKv::connect(&file_config.redis.url).await {
            Ok(kv) => {
                tracing::info!("Redis connection established");
                Arc::new(kv)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; KV layer disabled");
                Arc::new(DisabledKv)
            }
        }
    };

    // In-process bus: the dispatcher publishes outbox rows into it and
    // the inbox consumer drains them. A broker deployment swaps this for
    // real bindings of the same two traits.
    let bus = Arc::new(MemoryBus::new());

    let pipeline = spawn_pipeline(&db_pool, bus.clone(), &file_config);

    let processor = DatabaseProcessor {
        pool: db_pool.clone(),
    };
    let state = AppState {
        db: db_pool.clone(),
        bet: Arc::new(BetService::new(
            processor.clone(),
            kv.clone(),
            config::bet_config(&file_config.bet)?,
            config::idem_config(&file_config.bet),
        )),
        draw: Arc::new(DrawService::new(processor.clone(), kv.clone())),
        lifecycle: Arc::new(LifecycleService::new(
            processor.clone(),
            kv.clone(),
            config::lifecycle_config(&file_config.lifecycle),
        )),
        round_query: Arc::new(RoundQueryService::new(processor, kv)),
    };

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // --- Graceful shutdown sequence ---

    // 1. Signal the background processors to stop.
    tracing::info!("Signaling processors to shut down...");
    let _ = pipeline.shutdown_tx.send(true);

    // 2. Wait for them to drain.
    for handle in pipeline.join_handles {
        let _ = handle.await;
    }
    tracing::info!("All processors shut down");

    // 3. Close database connections gracefully.
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Spawn the outbox dispatcher and the inbox consumer.
fn spawn_pipeline(db_pool: &PgPool, bus: Arc<MemoryBus>, config: &config::FileConfig) -> Pipeline {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut join_handles = Vec::new();

    let dispatcher = OutboxDispatcher::new(
        DatabaseProcessor {
            pool: db_pool.clone(),
        },
        bus.clone(),
        config::dispatcher_config(&config.dispatcher),
    );
    let dispatcher_shutdown_rx = shutdown_rx.clone();
    join_handles.push(tokio::spawn(async move {
        dispatcher.run(dispatcher_shutdown_rx).await;
    }));

    let consumer = InboxConsumer::new(
        DatabaseProcessor {
            pool: db_pool.clone(),
        },
        bus,
        InboxConsumerConfig::default(),
    );
    join_handles.push(tokio::spawn(async move {
        consumer.run(shutdown_rx).await;
    }));

    tracing::info!("Background pipeline started (dispatcher + consumer)");

    Pipeline {
        shutdown_tx,
        join_handles,
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
