//! NATS event publisher with a channel-based architecture: `emit` is
//! non-blocking and a background task owns the client, so request handlers
//! never wait on the broker. Events are fire and forget; a publish failure
//! never rolls back the in-memory state change that produced the event.

use rotation_core::config::NatsConfig;
use rotation_core::event_bus::EventSink;
use rotation_core::types::RotationEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Publishes rotation events to `<subject_prefix>.<slot_id>`, so the
/// stream stays partitioned by slot for downstream consumers.
pub struct NatsEventPublisher {
    sender: mpsc::Sender<RotationEvent>,
}

impl NatsEventPublisher {
    /// Connect to NATS and spawn the background publisher task.
    pub async fn connect(config: &NatsConfig) -> anyhow::Result<Self> {
        let client = async_nats::connect(config.urls.join(",")).await?;
        let (sender, receiver) = mpsc::channel::<RotationEvent>(config.event_buffer);

        let subject_prefix = config.subject_prefix.clone();
        tokio::spawn(async move {
            run_publisher(client, receiver, subject_prefix).await;
        });

        info!(urls = ?config.urls, "Event publisher connected to NATS");

        Ok(Self { sender })
    }
}

impl EventSink for NatsEventPublisher {
    fn emit(&self, event: RotationEvent) {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("events.dropped").increment(1);
            warn!("Rotation event dropped: {}", e);
        } else {
            metrics::counter!("events.queued").increment(1);
        }
    }
}

async fn run_publisher(
    client: async_nats::Client,
    mut receiver: mpsc::Receiver<RotationEvent>,
    subject_prefix: String,
) {
    while let Some(event) = receiver.recv().await {
        let subject = format!("{}.{}", subject_prefix, event.slot_id);
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize rotation event");
                continue;
            }
        };

        if let Err(e) = client.publish(subject, payload.into()).await {
            metrics::counter!("events.publish_errors").increment(1);
            warn!(
                error = %e,
                slot_id = %event.slot_id,
                "Failed to publish rotation event"
            );
        } else {
            metrics::counter!("events.published").increment(1);
        }
    }

    warn!("Event publisher channel closed");
}
