//! Progression events broadcast to interested listeners (UI notifications, metrics)

use serde::Serialize;

use super::actions::ActionKind;
use super::models::UserId;

/// A level up event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
}

impl LevelUp {
    /// Some when `new_level` is above `old_level`
    pub fn between(old_level: u32, new_level: u32) -> Option<Self> {
        (new_level > old_level).then_some(Self {
            old_level,
            new_level,
        })
    }
}

/// Events that can happen while awarding XP
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionEvent {
    XpAwarded {
        user_id: UserId,
        action: ActionKind,
        amount: u32,
        total_xp: u64,
    },
    LevelUp {
        user_id: UserId,
        level_up: LevelUp,
    },
    /// An action name outside the registry was submitted (ignored)
    UnknownAction { user_id: String, action: String },
    /// The award committed but its log entry was not written
    LogFailed {
        user_id: UserId,
        action: ActionKind,
        amount: u32,
        error: String,
    },
}
