//! XP progression engine
//!
//! Awards XP for user actions, derives levels from cumulative XP, and keeps
//! an append-only log of every award.
//!
//! # Architecture
//!
//! ```text
//! award(user, action)
//!      │
//!      ▼
//! RewardTable ──► UserStore (read) ──► LevelTable ──► UserStore (write) ──► EventLog
//!                                                                       │
//!                                                          LevelUp / ProgressionEvent
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = ProgressionEngine::open(&Config::load(None)?)?;
//!
//! let outcome = engine.award("alice", "publish_content").await?;
//! if let Some(level_up) = outcome.level_up() {
//!     println!("Level {}!", level_up.new_level);
//! }
//! ```

mod actions;
mod error;
mod events;
mod keyed_lock;
mod levels;
mod models;
mod orchestrator;
pub mod store;

pub use actions::{ActionKind, RewardConfigError, RewardTable, UnknownActionError};
pub use error::{AwardError, LogError, StoreError, StoreOp};
pub use events::{LevelUp, ProgressionEvent};
pub use keyed_lock::KeyedLocks;
pub use levels::{LevelProgress, LevelTable, LevelTableError, DEFAULT_THRESHOLDS};
pub use models::{ProgressionUpdate, UserId, UserProgression, XpEvent};
pub use orchestrator::{Award, AwardOrchestrator, AwardOutcome, AwardTimeouts, SkipReason};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use store::{
    EventLog, MemoryEventLog, MemoryUserStore, ProgressDb, SqliteEventLog, SqliteUserStore,
    UserStore,
};

/// Central entry point for progression tracking
///
/// Owns the storage backend and the award orchestrator. Cheap to clone.
#[derive(Clone)]
pub struct ProgressionEngine {
    orchestrator: Arc<AwardOrchestrator>,
}

impl ProgressionEngine {
    /// Open the SQLite database named by the config
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_path(&config.database_path(), config)
    }

    /// Open a SQLite database at a custom path
    pub fn with_path(path: &Path, config: &Config) -> Result<Self> {
        let db = ProgressDb::open(path)?;
        let timeouts = config.award_timeouts();
        Self::with_backends(
            Arc::new(SqliteUserStore::new(db.clone()).with_timeout(timeouts.store)),
            Arc::new(SqliteEventLog::new(db).with_timeout(timeouts.log)),
            config,
        )
    }

    /// Volatile engine backed by in-memory collections
    pub fn in_memory(config: &Config) -> Result<Self> {
        Self::with_backends(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryEventLog::new()),
            config,
        )
    }

    /// Build on caller-provided store and log
    pub fn with_backends(
        store: Arc<dyn UserStore>,
        log: Arc<dyn EventLog>,
        config: &Config,
    ) -> Result<Self> {
        let orchestrator =
            AwardOrchestrator::new(config.reward_table()?, config.level_table()?, store, log)
                .with_timeouts(config.award_timeouts());
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn orchestrator(&self) -> &Arc<AwardOrchestrator> {
        &self.orchestrator
    }

    /// Award XP for an action given by name
    pub async fn award(&self, user: &str, action: &str) -> Result<AwardOutcome, AwardError> {
        self.orchestrator.award_named(user, action).await
    }

    /// Current record and level progress, without creating a record
    pub async fn progress(&self, user: &str) -> Result<Option<(UserProgression, LevelProgress)>> {
        let user_id = parse_user(user)?;
        let record = self.orchestrator.store().get(&user_id).await?;
        Ok(record.map(|record| {
            let progress = LevelProgress::new(self.orchestrator.levels(), record.total_xp);
            (record, progress)
        }))
    }

    /// Most recent XP events for a user, newest first
    pub async fn history(&self, user: &str, limit: usize) -> Result<Vec<XpEvent>> {
        let user_id = parse_user(user)?;
        let events = self.orchestrator.event_log().history(&user_id, limit).await?;
        Ok(events)
    }

    /// Top users by total XP
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>> {
        let ranked = self.orchestrator.store().leaderboard(limit).await?;
        Ok(ranked)
    }
}

fn parse_user(user: &str) -> Result<UserId> {
    UserId::new(user).with_context(|| format!("Invalid user identifier: {user:?}"))
}
