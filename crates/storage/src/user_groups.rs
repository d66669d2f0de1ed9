//! Known user groups. New banners get zero-valued statistics rows seeded
//! for every group listed here.

use crate::db::Database;
use rotation_core::error::RotationResult;
use rotation_core::types::UserGroupId;
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroup {
    pub id: UserGroupId,
    pub description: String,
}

impl Database {
    pub fn create_user_group(&self, description: &str) -> RotationResult<UserGroupId> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_groups (description) VALUES (?1)",
                params![description],
            )?;
            Ok(UserGroupId::new(conn.last_insert_rowid() as u64))
        })
    }

    pub fn get_user_group(&self, id: UserGroupId) -> RotationResult<Option<UserGroup>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, description FROM user_groups WHERE id = ?1",
                params![id.0 as i64],
                |row| {
                    Ok(UserGroup {
                        id: UserGroupId::new(row.get::<_, i64>(0)? as u64),
                        description: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn all_user_group_ids(&self) -> RotationResult<Vec<UserGroupId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM user_groups ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                row.get::<_, i64>(0).map(|id| UserGroupId::new(id as u64))
            })?;
            rows.collect()
        })
    }
}
