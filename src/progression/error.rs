//! Error types for progression storage and awards

use std::time::Duration;

/// Failure reading or writing a user progression record
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Corrupt progression row: {0}")]
    Corrupt(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure appending to or reading the XP event log
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Event log lock poisoned")]
    Poisoned,

    #[error("Event log task failed: {0}")]
    Task(String),

    #[error("Corrupt event row: {0}")]
    Corrupt(String),

    #[error("Event log call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Event log unavailable: {0}")]
    Unavailable(String),
}

/// External call guarded by a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Outcome of a failed award attempt. Log failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum AwardError {
    #[error("Invalid user identifier: {0:?}")]
    InvalidUser(String),

    #[error("Progression store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Progression store {op} timed out after {after:?}")]
    Timeout { op: StoreOp, after: Duration },
}
