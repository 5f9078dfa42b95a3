//! Storage collaborators of the award pipeline
//!
//! The orchestrator only talks to these traits. Two backends ship with the
//! crate: an in-memory one and a SQLite one (`~/.xpengine/progress.db`).

mod db;
mod memory;
mod sqlite;

pub use db::ProgressDb;
pub use memory::{MemoryEventLog, MemoryUserStore};
pub use sqlite::{SqliteEventLog, SqliteUserStore};

use async_trait::async_trait;

use super::error::{LogError, StoreError};
use super::models::{ProgressionUpdate, UserId, UserProgression, XpEvent};

/// Persistent per-user progression state
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load the record, creating a fresh one (0 XP, level 1) if absent
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError>;

    /// Load the record without creating it
    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError>;

    /// Overwrite XP and level fields, returning the stored record
    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError>;

    /// Highest total XP first (ties by user id)
    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError>;
}

/// Append-only sink for XP award records
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: &XpEvent) -> Result<(), LogError>;

    /// Most recent events for a user, newest first
    async fn history(&self, user: &UserId, limit: usize) -> Result<Vec<XpEvent>, LogError>;
}
