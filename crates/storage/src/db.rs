use parking_lot::Mutex;
use rotation_core::error::{RotationError, RotationResult};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS slots (
        id INTEGER PRIMARY KEY,
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS banners (
        id INTEGER PRIMARY KEY,
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS user_groups (
        id INTEGER PRIMARY KEY,
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS slot_banners (
        slot_id INTEGER NOT NULL,
        banner_id INTEGER NOT NULL,
        PRIMARY KEY (slot_id, banner_id)
    );

    CREATE TABLE IF NOT EXISTS statistics (
        slot_id INTEGER NOT NULL,
        banner_id INTEGER NOT NULL,
        user_group_id INTEGER NOT NULL,
        clicks INTEGER NOT NULL DEFAULT 0,
        views INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (slot_id, banner_id, user_group_id)
    );
";

/// Handle to the SQLite database, cloneable across handlers. All access
/// is serialized through one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &str) -> RotationResult<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(storage_err)?;
        let db = Self::from_connection(conn)?;
        info!(path = %path, "Database opened");
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> RotationResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> RotationResult<Self> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> RotationResult<T> {
        let mut conn = self.conn.lock();
        f(&mut conn).map_err(storage_err)
    }
}

fn storage_err(e: rusqlite::Error) -> RotationError {
    RotationError::Storage(e.to_string())
}
