//! Durable per (slot, banner, user group) view/click counters.

use crate::db::Database;
use rotation_core::error::RotationResult;
use rotation_core::types::{BannerId, SlotId, UserGroupId};
use rusqlite::{params, OptionalExtension};

/// One durable statistics row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsRow {
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub user_group_id: UserGroupId,
    pub clicks: u64,
    pub views: u64,
}

impl Database {
    /// Seed zero-valued statistics rows for a banner across the given user
    /// groups, in one transaction. Existing rows are left untouched.
    pub fn seed_banner_statistics(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_ids: &[UserGroupId],
    ) -> RotationResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO statistics
                     (slot_id, banner_id, user_group_id, clicks, views)
                     VALUES (?1, ?2, ?3, 0, 0)",
                )?;
                for group_id in group_ids {
                    stmt.execute(params![
                        slot_id.0 as i64,
                        banner_id.0 as i64,
                        group_id.0 as i64
                    ])?;
                }
            }
            tx.commit()
        })
    }

    /// Increment the durable click counter, creating the row if the mirror
    /// has not seen this triple yet.
    pub fn increment_click(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<()> {
        self.bump_counter("clicks", slot_id, banner_id, group_id)
    }

    /// Increment the durable view counter, creating the row if needed.
    pub fn increment_view(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<()> {
        self.bump_counter("views", slot_id, banner_id, group_id)
    }

    fn bump_counter(
        &self,
        column: &str,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<()> {
        // `column` is one of two compile-time literals, never user input.
        let sql = format!(
            "INSERT INTO statistics (slot_id, banner_id, user_group_id, {column})
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (slot_id, banner_id, user_group_id)
             DO UPDATE SET {column} = {column} + 1"
        );
        self.with_conn(|conn| {
            conn.execute(
                &sql,
                params![slot_id.0 as i64, banner_id.0 as i64, group_id.0 as i64],
            )?;
            Ok(())
        })
    }

    /// Read the statistics row for a triple, if the mirror has one.
    pub fn get_statistics(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<Option<StatisticsRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT clicks, views FROM statistics
                 WHERE slot_id = ?1 AND banner_id = ?2 AND user_group_id = ?3",
                params![slot_id.0 as i64, banner_id.0 as i64, group_id.0 as i64],
                |row| {
                    Ok(StatisticsRow {
                        slot_id,
                        banner_id,
                        user_group_id: group_id,
                        clicks: row.get::<_, i64>(0)? as u64,
                        views: row.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .optional()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_creates_zero_rows() {
        let db = Database::open_in_memory().unwrap();
        let slot = SlotId::new(1);
        let banner = BannerId::new(2);
        let groups = [UserGroupId::new(1), UserGroupId::new(2)];

        db.seed_banner_statistics(slot, banner, &groups).unwrap();

        for group in groups {
            let row = db.get_statistics(slot, banner, group).unwrap().unwrap();
            assert_eq!((row.clicks, row.views), (0, 0));
        }
    }

    #[test]
    fn test_seed_preserves_existing_counters() {
        let db = Database::open_in_memory().unwrap();
        let slot = SlotId::new(1);
        let banner = BannerId::new(2);
        let group = UserGroupId::new(3);

        db.increment_click(slot, banner, group).unwrap();
        db.seed_banner_statistics(slot, banner, &[group]).unwrap();

        let row = db.get_statistics(slot, banner, group).unwrap().unwrap();
        assert_eq!(row.clicks, 1);
    }

    #[test]
    fn test_increment_upserts() {
        let db = Database::open_in_memory().unwrap();
        let slot = SlotId::new(1);
        let banner = BannerId::new(2);
        let group = UserGroupId::new(3);

        // No seeded row: the first increment creates it.
        db.increment_click(slot, banner, group).unwrap();
        db.increment_click(slot, banner, group).unwrap();
        db.increment_view(slot, banner, group).unwrap();

        let row = db.get_statistics(slot, banner, group).unwrap().unwrap();
        assert_eq!(row.clicks, 2);
        assert_eq!(row.views, 1);
    }

    #[test]
    fn test_missing_row_reads_as_none() {
        let db = Database::open_in_memory().unwrap();
        let row = db
            .get_statistics(SlotId::new(9), BannerId::new(9), UserGroupId::new(9))
            .unwrap();
        assert!(row.is_none());
    }
}
