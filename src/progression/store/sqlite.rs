//! SQLite-backed user store and event log

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{BlockingError, ProgressDb};
use super::{EventLog, UserStore};
use crate::progression::actions::ActionKind;
use crate::progression::error::{LogError, StoreError};
use crate::progression::models::{ProgressionUpdate, UserId, UserProgression, XpEvent};

impl From<BlockingError> for StoreError {
    fn from(e: BlockingError) -> Self {
        match e {
            BlockingError::Poisoned => Self::Poisoned,
            BlockingError::Join(msg) => Self::Task(msg),
            BlockingError::Deadline(after) => Self::Timeout(after),
            BlockingError::Sqlite(e) => Self::Sqlite(e),
        }
    }
}

impl From<BlockingError> for LogError {
    fn from(e: BlockingError) -> Self {
        match e {
            BlockingError::Poisoned => Self::Poisoned,
            BlockingError::Join(msg) => Self::Task(msg),
            BlockingError::Deadline(after) => Self::Timeout(after),
            BlockingError::Sqlite(e) => Self::Sqlite(e),
        }
    }
}

/// Bound on each call when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

fn to_sql_int(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("XP value out of range: {value}")))
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Raw `user_progress` row before validation
struct ProgressRow {
    user_id: String,
    total_xp: i64,
    current_xp: i64,
    level: i64,
    created_at: i64,
    updated_at: i64,
}

impl ProgressRow {
    const COLUMNS: &'static str = "user_id, total_xp, current_xp, level, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            total_xp: row.get(1)?,
            current_xp: row.get(2)?,
            level: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<UserProgression, StoreError> {
        let corrupt = |what: &str| StoreError::Corrupt(format!("{what} for user {:?}", self.user_id));
        Ok(UserProgression {
            user_id: UserId::new(self.user_id.clone()).ok_or_else(|| corrupt("blank id"))?,
            total_xp: u64::try_from(self.total_xp).map_err(|_| corrupt("negative total_xp"))?,
            current_xp: u64::try_from(self.current_xp).map_err(|_| corrupt("negative current_xp"))?,
            level: u32::try_from(self.level)
                .ok()
                .filter(|&l| l >= 1)
                .ok_or_else(|| corrupt("invalid level"))?,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

fn select_progress(conn: &Connection, user: &str) -> Result<Option<UserProgression>, StoreError> {
    let sql = format!(
        "SELECT {} FROM user_progress WHERE user_id = ?1",
        ProgressRow::COLUMNS
    );
    conn.query_row(&sql, [user], ProgressRow::from_row)
        .optional()?
        .map(ProgressRow::into_record)
        .transpose()
}

/// User progression records in the `user_progress` table
#[derive(Clone)]
pub struct SqliteUserStore {
    db: ProgressDb,
    timeout: Duration,
}

impl SqliteUserStore {
    pub fn new(db: ProgressDb) -> Self {
        Self {
            db,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each call; a write not committed in time is rolled back
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError> {
        let user = user.clone();
        self.db
            .write(self.timeout, move |conn| {
                let now = Utc::now().timestamp_millis();
                conn.execute(
                    "INSERT OR IGNORE INTO user_progress (user_id, created_at, updated_at)
                     VALUES (?1, ?2, ?2)",
                    params![user.as_str(), now],
                )?;
                select_progress(conn, user.as_str())?.ok_or_else(|| {
                    StoreError::Corrupt(format!("record for {user} missing after insert"))
                })
            })
            .await
    }

    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError> {
        let user = user.clone();
        self.db
            .read(self.timeout, move |conn| {
                select_progress(conn, user.as_str())
            })
            .await
    }

    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError> {
        let user = user.clone();
        self.db
            .write(self.timeout, move |conn| {
                let total = to_sql_int(update.total_xp)?;
                let current = to_sql_int(update.current_xp)?;
                let now = update.updated_at.timestamp_millis();
                conn.execute(
                    r#"
                    INSERT INTO user_progress (user_id, total_xp, current_xp, level, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                    ON CONFLICT(user_id) DO UPDATE SET
                        total_xp = ?2, current_xp = ?3, level = ?4, updated_at = ?5
                    "#,
                    params![user.as_str(), total, current, update.level, now],
                )?;
                select_progress(conn, user.as_str())?.ok_or_else(|| {
                    StoreError::Corrupt(format!("record for {user} missing after update"))
                })
            })
            .await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .read(self.timeout, move |conn| -> Result<Vec<UserProgression>, StoreError> {
                let sql = format!(
                    "SELECT {} FROM user_progress ORDER BY total_xp DESC, user_id ASC LIMIT ?1",
                    ProgressRow::COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([limit], ProgressRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.into_iter().map(ProgressRow::into_record).collect()
            })
            .await
    }
}

/// Award log in the `xp_events` table
#[derive(Clone)]
pub struct SqliteEventLog {
    db: ProgressDb,
    timeout: Duration,
}

impl SqliteEventLog {
    pub fn new(db: ProgressDb) -> Self {
        Self {
            db,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each call; a write not committed in time is rolled back
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn append(&self, event: &XpEvent) -> Result<(), LogError> {
        let event = event.clone();
        self.db
            .write(self.timeout, move |conn| -> Result<(), LogError> {
                conn.execute(
                    "INSERT INTO xp_events (user_id, action, xp, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        event.user_id.as_str(),
                        event.action.as_str(),
                        event.xp,
                        event.timestamp.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn history(&self, user: &UserId, limit: usize) -> Result<Vec<XpEvent>, LogError> {
        let user = user.clone();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .read(self.timeout, move |conn| -> Result<Vec<XpEvent>, LogError> {
                let mut stmt = conn.prepare(
                    "SELECT id, action, xp, created_at FROM xp_events
                     WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![user.as_str(), limit], |r| {
                        Ok((
                            r.get::<_, i64>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, u32>(2)?,
                            r.get::<_, i64>(3)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                rows.into_iter()
                    .map(|(id, action, xp, created_at)| {
                        let action = ActionKind::parse(&action).ok_or_else(|| {
                            LogError::Corrupt(format!("unknown action {action:?} in event {id}"))
                        })?;
                        Ok(XpEvent {
                            id: Some(id),
                            user_id: user.clone(),
                            action,
                            xp,
                            timestamp: from_millis(created_at),
                        })
                    })
                    .collect()
            })
            .await
    }
}
