//! In-memory store and event log
//!
//! Used by tests and by embedders that keep progression state elsewhere.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{EventLog, UserStore};
use crate::progression::error::{LogError, StoreError};
use crate::progression::models::{ProgressionUpdate, UserId, UserProgression, XpEvent};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: Mutex<HashMap<UserId, UserProgression>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_or_create(&self, user: &UserId) -> Result<UserProgression, StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let record = records
            .entry(user.clone())
            .or_insert_with(|| UserProgression::new(user.clone(), Utc::now()));
        Ok(record.clone())
    }

    async fn get(&self, user: &UserId) -> Result<Option<UserProgression>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(user).cloned())
    }

    async fn update(
        &self,
        user: &UserId,
        update: ProgressionUpdate,
    ) -> Result<UserProgression, StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let record = records
            .entry(user.clone())
            .or_insert_with(|| UserProgression::new(user.clone(), update.updated_at));
        record.apply(&update);
        Ok(record.clone())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgression>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let mut ranked: Vec<UserProgression> = records.values().cloned().collect();
        ranked.sort_by(|a, b| {
            b.total_xp
                .cmp(&a.total_xp)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<XpEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended event, oldest first
    pub fn events(&self) -> Vec<XpEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, event: &XpEvent) -> Result<(), LogError> {
        let mut events = self.events.lock().map_err(|_| LogError::Poisoned)?;
        let mut event = event.clone();
        event.id = Some(events.len() as i64 + 1);
        events.push(event);
        Ok(())
    }

    async fn history(&self, user: &UserId, limit: usize) -> Result<Vec<XpEvent>, LogError> {
        let events = self.events.lock().map_err(|_| LogError::Poisoned)?;
        Ok(events
            .iter()
            .rev()
            .filter(|e| &e.user_id == user)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::actions::ActionKind;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_explicit() {
        let store = MemoryUserStore::new();
        assert!(store.get(&user("alice")).await.unwrap().is_none());

        let created = store.get_or_create(&user("alice")).await.unwrap();
        assert_eq!(created.total_xp, 0);
        assert_eq!(created.level, 1);
        assert_eq!(store.get(&user("alice")).await.unwrap(), Some(created));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_leaderboard() {
        let store = MemoryUserStore::new();
        for (id, xp) in [("alice", 120), ("bob", 300), ("carol", 120)] {
            store
                .update(
                    &user(id),
                    ProgressionUpdate {
                        total_xp: xp,
                        current_xp: xp,
                        level: 2,
                        updated_at: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let top = store.leaderboard(2).await.unwrap();
        let ids: Vec<&str> = top.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "alice"]);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_per_user() {
        let log = MemoryEventLog::new();
        for (id, action) in [
            ("alice", ActionKind::DailyLogin),
            ("bob", ActionKind::ReceiveLike),
            ("alice", ActionKind::PublishContent),
        ] {
            log.append(&XpEvent::new(user(id), action, 10, Utc::now()))
                .await
                .unwrap();
        }

        let history = log.history(&user("alice"), 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, ActionKind::PublishContent);
        assert_eq!(history[0].id, Some(3));
        assert_eq!(log.history(&user("alice"), 1).await.unwrap().len(), 1);
    }
}
