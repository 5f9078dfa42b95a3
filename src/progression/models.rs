//! Progression data models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::actions::ActionKind;

/// Opaque user identifier (never empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Returns None for blank identifiers
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user gamification state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgression {
    pub user_id: UserId,
    pub total_xp: u64,
    /// Mirrors total_xp (no decay or spending)
    pub current_xp: u64,
    pub level: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgression {
    /// Fresh record: zero XP, level 1
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_xp: 0,
            current_xp: 0,
            level: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update in place
    pub fn apply(&mut self, update: &ProgressionUpdate) {
        self.total_xp = update.total_xp;
        self.current_xp = update.current_xp;
        self.level = update.level;
        self.updated_at = update.updated_at;
    }
}

/// Fields written back by an award
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionUpdate {
    pub total_xp: u64,
    pub current_xp: u64,
    pub level: u32,
    pub updated_at: DateTime<Utc>,
}

/// Append-only log entry, one per award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    /// Assigned by the sink (None until appended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: UserId,
    pub action: ActionKind,
    pub xp: u32,
    pub timestamp: DateTime<Utc>,
}

impl XpEvent {
    pub fn new(user_id: UserId, action: ActionKind, xp: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id,
            action,
            xp,
            timestamp,
        }
    }
}
