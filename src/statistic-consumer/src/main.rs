//! Statistic consumer. Subscribes to the rotation event stream and logs
//! every click/view event; the ingestion seam for downstream reporting.

use clap::Parser;
use rotation_core::config::AppConfig;
use rotation_core::types::RotationEvent;
use tokio_stream::StreamExt;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "statistic-consumer")]
#[command(about = "Consumes banner rotation events from NATS")]
#[command(version)]
struct Cli {
    /// NATS subject prefix to subscribe under (overrides config)
    #[arg(long, env = "BANNER_ROTATION__NATS__SUBJECT_PREFIX")]
    subject_prefix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statistic_consumer=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(prefix) = cli.subject_prefix {
        config.nats.subject_prefix = prefix;
    }

    let subject = format!("{}.>", config.nats.subject_prefix);
    info!(urls = ?config.nats.urls, subject = %subject, "Connecting to NATS");

    let client = async_nats::connect(config.nats.urls.join(",")).await?;
    let mut subscriber = client.subscribe(subject).await?;

    info!("Statistic consumer ready");

    while let Some(msg) = subscriber.next().await {
        match serde_json::from_slice::<RotationEvent>(&msg.payload) {
            Ok(event) => {
                info!(
                    event_id = %event.event_id,
                    event_type = ?event.event_type,
                    slot_id = %event.slot_id,
                    banner_id = %event.banner_id,
                    user_group_id = %event.user_group_id,
                    "Event received"
                );
            }
            Err(e) => {
                warn!(error = %e, subject = %msg.subject, "Failed to decode event");
            }
        }
    }

    Ok(())
}
