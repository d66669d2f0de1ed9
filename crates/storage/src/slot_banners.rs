//! Slot to banner associations.

use crate::db::Database;
use rotation_core::error::RotationResult;
use rotation_core::types::{BannerId, SlotId};
use rusqlite::params;

impl Database {
    /// Persist a slot/banner association. Idempotent.
    pub fn add_banner_to_slot(&self, slot_id: SlotId, banner_id: BannerId) -> RotationResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO slot_banners (slot_id, banner_id) VALUES (?1, ?2)",
                params![slot_id.0 as i64, banner_id.0 as i64],
            )?;
            Ok(())
        })
    }

    /// Delete a slot/banner association. Deleting a missing row is a no-op.
    pub fn remove_banner_from_slot(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
    ) -> RotationResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM slot_banners WHERE slot_id = ?1 AND banner_id = ?2",
                params![slot_id.0 as i64, banner_id.0 as i64],
            )?;
            Ok(())
        })
    }

    /// Banner ids currently associated with a slot, ordered by id.
    pub fn banners_for_slot(&self, slot_id: SlotId) -> RotationResult<Vec<BannerId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT banner_id FROM slot_banners WHERE slot_id = ?1 ORDER BY banner_id",
            )?;
            let rows = stmt.query_map(params![slot_id.0 as i64], |row| {
                row.get::<_, i64>(0).map(|id| BannerId::new(id as u64))
            })?;
            rows.collect()
        })
    }
}
