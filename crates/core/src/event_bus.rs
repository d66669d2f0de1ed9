//! Event bus abstraction for click/view feedback events.
//!
//! Modules accept an `Arc<dyn EventSink>` to emit events toward the
//! message bus. Publication is best effort: a failed or dropped emit never
//! affects the in-memory decision state already applied.

use crate::types::{BannerId, RotationEvent, RotationEventType, SlotId, UserGroupId};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Trait for emitting rotation events. The production implementation
/// routes events to NATS; tests use a capturing sink.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RotationEvent);
}

/// No-op sink for tests and setups without a broker.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: RotationEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<RotationEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<RotationEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: RotationEventType) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: RotationEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

/// Convenience builder for a `RotationEvent` stamped with a fresh id and
/// the current time.
pub fn make_event(
    event_type: RotationEventType,
    slot_id: SlotId,
    banner_id: BannerId,
    user_group_id: UserGroupId,
) -> RotationEvent {
    RotationEvent {
        event_id: Uuid::new_v4(),
        event_type,
        slot_id,
        banner_id,
        user_group_id,
        timestamp: Utc::now(),
    }
}

/// Convenience: create a no-op event bus for setups that don't need one.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        sink.emit(make_event(
            RotationEventType::View,
            SlotId::new(1),
            BannerId::new(2),
            UserGroupId::new(3),
        ));
        sink.emit(make_event(
            RotationEventType::Click,
            SlotId::new(1),
            BannerId::new(2),
            UserGroupId::new(3),
        ));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_type(RotationEventType::View), 1);
        assert_eq!(sink.count_type(RotationEventType::Click), 1);

        let events = sink.events();
        assert_eq!(events[0].slot_id, SlotId::new(1));
        assert_eq!(events[1].event_type, RotationEventType::Click);

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        // Should not panic
        sink.emit(make_event(
            RotationEventType::View,
            SlotId::new(1),
            BannerId::new(1),
            UserGroupId::new(1),
        ));
    }
}
