//! Banner rotation service. Serves low-latency banner selection decisions
//! from an in-memory UCB1 bandit engine, mirroring traffic into SQLite and
//! publishing view/click events to NATS.
//!
//! Main entry point that wires all subsystems and starts the server.

use clap::Parser;
use rotation_api::service::RotationService;
use rotation_api::ApiServer;
use rotation_core::config::AppConfig;
use rotation_core::event_bus::{noop_sink, EventSink};
use rotation_engine::BanditEngine;
use rotation_events::NatsEventPublisher;
use rotation_storage::Database;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "banner-rotation")]
#[command(about = "Banner rotation service with UCB1-based selection")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "BANNER_ROTATION__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BANNER_ROTATION__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "BANNER_ROTATION__STORAGE__PATH")]
    db_path: Option<String>,

    /// Skip NATS event publishing (API-only mode)
    #[arg(long, default_value_t = false)]
    no_events: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banner_rotation=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Banner rotation service starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(path) = cli.db_path {
        config.storage.path = path;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        db_path = %config.storage.path,
        "Configuration loaded"
    );

    // Open the durable store
    let store = Database::open(&config.storage.path)?;

    // The in-memory engine is the source of truth for selection decisions.
    let engine = Arc::new(BanditEngine::new());

    // Connect the event publisher (unless disabled)
    let events: Arc<dyn EventSink> = if cli.no_events {
        info!("Running without event publishing (--no-events)");
        noop_sink()
    } else {
        match NatsEventPublisher::connect(&config.nats).await {
            Ok(publisher) => Arc::new(publisher),
            Err(e) => {
                error!(error = %e, "Failed to connect to NATS, events disabled");
                noop_sink()
            }
        }
    };

    let service = Arc::new(RotationService::new(engine, store, events));

    // Start API server
    let api_server = ApiServer::new(config.clone(), service);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Banner rotation service is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
