//! Shared test doubles for award pipeline tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use xpengine::progression::store::{
    EventLog, MemoryEventLog, MemoryUserStore, SqliteEventLog, SqliteUserStore, UserStore,
};
use xpengine::progression::{
    AwardOrchestrator, AwardTimeouts, LevelTable, LogError, ProgressionUpdate, RewardTable,
    StoreError, UserId, UserProgression, XpEvent,
};

pub fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

/// Orchestrator over the given backends with default tables
pub fn orchestrator(store: Arc<dyn UserStore>, log: Arc<dyn EventLog>) -> AwardOrchestrator {
    AwardOrchestrator::new(RewardTable::default(), LevelTable::default(), store, log)
}

pub fn short_timeouts() -> AwardTimeouts {
    AwardTimeouts {
        store: Duration::from_millis(50),
        log: Duration::from_millis(50),
    }
}

/// Seed a record with an exact XP total
pub async fn seed(store: &dyn UserStore, id: &str, total_xp: u64) {
    store
        .update(
            &user(id),
            ProgressionUpdate {
                total_xp,
                current_xp: total_xp,
                level: LevelTable::default().level_for(total_xp),
                updated_at: Utc::now(),
            },
        )
        .await
        .expect("seed record");
}

/// Event log whose appends always fail
#[derive(Default)]
pub struct FailingLog {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl EventLog for FailingLog {
    async fn append(&self, _event: &XpEvent) -> Result<(), LogError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LogError::Unavailable("disk full".to_string()))
    }

    async fn history(&self, _user: &UserId, _limit: usize) -> Result<Vec<XpEvent>, LogError> {
        Ok(Vec::new())
    }
}

/// Event log that never answers in time
pub struct StalledLog;

#[async_trait]
impl EventLog for StalledLog {
    async fn append(&self, _event: &XpEvent) -> Result<(), LogError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn history(&self, _user: &UserId, _limit: usize) -> Result<Vec<XpEvent>, LogError> {
        Ok(Vec::new())
    }
}

/// Which store call a `FaultyStore` breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    FailWrite,
    StallRead,
    StallWrite,
}

/// Memory store with one injected fault
pub struct FaultyStore {
    pub inner: MemoryUserStore,
    pub fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemoryUserStore::new(),
            fault,
        }
    }
}

#[async_trait]
impl UserStore for FaultyStore {
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError> {
        if self.fault == Fault::StallRead {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.inner.get_or_create(user).await
    }

    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError> {
        self.inner.get(user).await
    }

    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError> {
        match self.fault {
            Fault::FailWrite => Err(StoreError::Unavailable("connection reset".to_string())),
            Fault::StallWrite => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                self.inner.update(user, update).await
            }
            Fault::StallRead => self.inner.update(user, update).await,
        }
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError> {
        self.inner.leaderboard(limit).await
    }
}

/// Memory store that yields between read and write, widening race windows
#[derive(Default)]
pub struct YieldingStore {
    pub inner: MemoryUserStore,
}

#[async_trait]
impl UserStore for YieldingStore {
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError> {
        let record = self.inner.get_or_create(user).await;
        tokio::task::yield_now().await;
        record
    }

    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError> {
        self.inner.get(user).await
    }

    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError> {
        tokio::task::yield_now().await;
        self.inner.update(user, update).await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError> {
        self.inner.leaderboard(limit).await
    }
}

/// Take the database write lock from a second connection and keep it for
/// `hold`. Returns once the lock is held.
pub async fn hold_write_lock(path: &Path, hold: Duration) -> JoinHandle<()> {
    let path = path.to_path_buf();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let holder = std::thread::spawn(move || {
        let conn = rusqlite::Connection::open(&path).expect("open second connection");
        conn.execute_batch("BEGIN IMMEDIATE").expect("take write lock");
        let _ = ready_tx.send(());
        std::thread::sleep(hold);
        conn.execute_batch("COMMIT").expect("release write lock");
    });
    ready_rx.await.expect("lock holder started");
    holder
}

/// SQLite store whose update finds another writer holding the database
pub struct ContendedStore {
    pub inner: SqliteUserStore,
    pub path: PathBuf,
    pub hold: Duration,
}

#[async_trait]
impl UserStore for ContendedStore {
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError> {
        let record = self.inner.get_or_create(user).await?;
        hold_write_lock(&self.path, self.hold).await;
        Ok(record)
    }

    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError> {
        self.inner.get(user).await
    }

    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError> {
        self.inner.update(user, update).await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError> {
        self.inner.leaderboard(limit).await
    }
}

/// SQLite event log whose appends find another writer holding the database
pub struct ContendedLog {
    pub inner: SqliteEventLog,
    pub path: PathBuf,
    pub hold: Duration,
}

#[async_trait]
impl EventLog for ContendedLog {
    async fn append(&self, event: &XpEvent) -> Result<(), LogError> {
        hold_write_lock(&self.path, self.hold).await;
        self.inner.append(event).await
    }

    async fn history(&self, user: &UserId, limit: usize) -> Result<Vec<XpEvent>, LogError> {
        self.inner.history(user, limit).await
    }
}

pub fn memory_backends() -> (Arc<MemoryUserStore>, Arc<MemoryEventLog>) {
    (Arc::new(MemoryUserStore::new()), Arc::new(MemoryEventLog::new()))
}
