//! Best-effort publication of click/view events to NATS.

pub mod publisher;

pub use publisher::NatsEventPublisher;
