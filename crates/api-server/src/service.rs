//! Per-request orchestration behind the REST handlers.
//!
//! The in-memory engine is the source of truth and is always updated
//! first; the durable store and the event bus are mirrors updated after
//! the engine call returns. An event that fails to publish never rolls
//! back engine state.

use rotation_core::error::{RotationError, RotationResult};
use rotation_core::event_bus::{make_event, EventSink};
use rotation_core::types::{BannerId, RotationEventType, SlotId, UserGroupId};
use rotation_engine::BanditEngine;
use rotation_storage::Database;
use std::sync::Arc;

pub struct RotationService {
    engine: Arc<BanditEngine>,
    store: Database,
    events: Arc<dyn EventSink>,
}

impl RotationService {
    pub fn new(engine: Arc<BanditEngine>, store: Database, events: Arc<dyn EventSink>) -> Self {
        Self {
            engine,
            store,
            events,
        }
    }

    /// Register a banner in a slot, persist the association and seed
    /// zero-valued durable statistics for every known user group.
    pub async fn add_banner(&self, slot_id: SlotId, banner_id: BannerId) -> RotationResult<()> {
        self.engine.register_banner(slot_id, banner_id);

        let store = self.store.clone();
        run_blocking(move || {
            store.add_banner_to_slot(slot_id, banner_id)?;
            let group_ids = store.all_user_group_ids()?;
            store.seed_banner_statistics(slot_id, banner_id, &group_ids)
        })
        .await
    }

    /// Retire a banner from a slot and drop the durable association.
    pub async fn remove_banner(&self, slot_id: SlotId, banner_id: BannerId) -> RotationResult<()> {
        self.engine.retire_banner(slot_id, banner_id)?;

        let store = self.store.clone();
        run_blocking(move || store.remove_banner_from_slot(slot_id, banner_id)).await
    }

    /// Record a click, publish a `Click` event and bump the durable
    /// counter.
    pub async fn record_click(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<()> {
        self.engine.record_click(slot_id, banner_id, group_id)?;

        self.events.emit(make_event(
            RotationEventType::Click,
            slot_id,
            banner_id,
            group_id,
        ));

        let store = self.store.clone();
        run_blocking(move || store.increment_click(slot_id, banner_id, group_id)).await
    }

    /// Select a banner for display. `None` means the slot is unknown or
    /// has no active banners; it is not an error. A selection publishes a
    /// `View` event and bumps the durable view counter.
    pub async fn select_banner(
        &self,
        slot_id: SlotId,
        group_id: UserGroupId,
    ) -> RotationResult<Option<BannerId>> {
        let Some(banner_id) = self.engine.select_banner(slot_id, group_id) else {
            return Ok(None);
        };

        self.events.emit(make_event(
            RotationEventType::View,
            slot_id,
            banner_id,
            group_id,
        ));

        let store = self.store.clone();
        run_blocking(move || store.increment_view(slot_id, banner_id, group_id)).await?;

        Ok(Some(banner_id))
    }
}

/// Dispatch a blocking SQLite call off the async runtime.
async fn run_blocking<T>(
    f: impl FnOnce() -> RotationResult<T> + Send + 'static,
) -> RotationResult<T>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RotationError::Internal(e.into()))?
}
