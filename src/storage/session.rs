use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{TrackerError, TrackerResult};

use super::{
    entities::TrackerKind,
    entry_store::{create_table_sql, SqliteEntryStore},
    typed::{Tracker, TypedStore},
};

/// Owns the one database connection of the process. Views borrow stores from it, so they can't
/// outlive it, and dropping the session closes the connection.
pub struct StorageSession {
    conn: Connection,
    path: Option<PathBuf>,
}

impl StorageSession {
    /// Opens (creating if needed) the database at `path` and makes sure every tracker table
    /// exists.
    pub fn open(path: &Path) -> TrackerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TrackerError::Connection {
                path: path.to_path_buf(),
                source: rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {e}")),
                ),
            })?;
        }

        let conn = Connection::open(path).map_err(|source| TrackerError::Connection {
            path: path.to_path_buf(),
            source,
        })?;
        let session = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        session.init().map_err(|e| match e {
            TrackerError::Query(source) => TrackerError::Connection {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!("Opened storage at {path:?}");
        Ok(session)
    }

    /// Session without a backing file. Used by tests.
    pub fn open_in_memory() -> TrackerResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| TrackerError::Connection {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let session = Self { conn, path: None };
        session.init()?;
        Ok(session)
    }

    fn init(&self) -> TrackerResult<()> {
        if self.path.is_some() {
            self.conn.execute_batch(
                r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#,
            )?;
        }
        for kind in TrackerKind::ALL {
            self.conn.execute_batch(&create_table_sql(kind))?;
            debug!("Ensured table {}", kind.table());
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self, kind: TrackerKind) -> SqliteEntryStore<'_> {
        SqliteEntryStore::new(&self.conn, kind)
    }

    pub fn typed<T: Tracker>(&self) -> TypedStore<SqliteEntryStore<'_>, T> {
        TypedStore::new(self.entries(T::KIND))
    }
}
