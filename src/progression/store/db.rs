//! SQLite database connection and schema management for progression data
//!
//! Manages the `~/.xpengine/progress.db` database with schema versioning.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Pause between attempts to take a contended connection
const LOCK_POLL: Duration = Duration::from_millis(2);

/// Shared database handle (cheap to clone)
#[derive(Clone)]
pub struct ProgressDb {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressDb {
    /// Open or create the progression database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create progression dir: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progression db: {}", path.display()))?;

        // WAL lets the CLI read while an embedding service writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection. None if a previous holder panicked.
    pub(crate) fn lock(&self) -> Option<MutexGuard<'_, Connection>> {
        self.conn.lock().ok()
    }

    /// Take the connection, giving up at `deadline`
    fn lock_until(
        &self,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<MutexGuard<'_, Connection>, BlockingError> {
        loop {
            match self.conn.try_lock() {
                Ok(conn) => return Ok(conn),
                Err(TryLockError::Poisoned(_)) => return Err(BlockingError::Poisoned),
                Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                    return Err(BlockingError::Deadline(timeout));
                }
                Err(TryLockError::WouldBlock) => std::thread::sleep(LOCK_POLL),
            }
        }
    }

    /// Run a read-only `f` on the blocking thread pool.
    ///
    /// Waiting for the connection (or for another process's write lock) is
    /// bounded by `timeout`.
    pub(crate) async fn read<T, E, F>(&self, timeout: Duration, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<BlockingError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        let deadline = Instant::now() + timeout;
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock_until(deadline, timeout)?;
            conn.busy_timeout(remaining(deadline))
                .map_err(|e| BlockingError::from_sqlite(e, timeout))?;
            f(&conn)
        })
        .await
        .map_err(|e| E::from(BlockingError::Join(e.to_string())))?
    }

    /// Run `f` inside an IMMEDIATE transaction on the blocking thread pool.
    ///
    /// The transaction only commits if `f` finishes within `timeout`;
    /// otherwise it is rolled back and `BlockingError::Deadline` returned, so
    /// a write reported as timed out never lands later.
    pub(crate) async fn write<T, E, F>(&self, timeout: Duration, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<BlockingError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        let deadline = Instant::now() + timeout;
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let sqlite = |e: rusqlite::Error| BlockingError::from_sqlite(e, timeout);
            let mut conn = db.lock_until(deadline, timeout)?;
            conn.busy_timeout(remaining(deadline)).map_err(sqlite)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(sqlite)?;

            let value = f(&tx)?;
            if Instant::now() >= deadline {
                // Dropping the transaction rolls it back
                return Err(BlockingError::Deadline(timeout).into());
            }
            tx.commit().map_err(sqlite)?;
            Ok(value)
        })
        .await
        .map_err(|e| E::from(BlockingError::Join(e.to_string())))?
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self
            .lock()
            .context("Progression DB lock poisoned")?;
        let version = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )?;
        Ok(version)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self
            .lock()
            .context("Progression DB lock poisoned")?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Failure around a blocking database call (outside the caller's own SQL)
#[derive(Debug)]
pub enum BlockingError {
    Poisoned,
    Join(String),
    /// Connection or database lock not obtained, or work not finished, in time
    Deadline(Duration),
    Sqlite(rusqlite::Error),
}

impl BlockingError {
    /// SQLITE_BUSY after the busy timeout is a missed deadline
    fn from_sqlite(e: rusqlite::Error, timeout: Duration) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::Deadline(timeout)
            }
            _ => Self::Sqlite(e),
        }
    }
}

/// SQL schema for the progression database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- One row per user, level always recomputed with total_xp
CREATE TABLE IF NOT EXISTS user_progress (
    user_id TEXT PRIMARY KEY,
    total_xp INTEGER NOT NULL DEFAULT 0,
    current_xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_progress_xp ON user_progress(total_xp DESC);

-- Append-only award log
CREATE TABLE IF NOT EXISTS xp_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    xp INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_user ON xp_events(user_id, id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.db");
        let db = ProgressDb::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);

        // Reopening is idempotent
        drop(db);
        let db = ProgressDb::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }
}
