//! Action registry
//!
//! The closed set of XP-granting actions and the reward each one is worth.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user action that can grant XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Published an article, course, or podcast episode
    PublishContent,
    ReceiveLike,
    ReceiveComment,
    /// Content crossed a view-count milestone
    ViewMilestone,
    CompleteMission,
    ContentShared,
    DailyLogin,
    PositiveRating,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        Self::PublishContent,
        Self::ReceiveLike,
        Self::ReceiveComment,
        Self::ViewMilestone,
        Self::CompleteMission,
        Self::ContentShared,
        Self::DailyLogin,
        Self::PositiveRating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublishContent => "publish_content",
            Self::ReceiveLike => "receive_like",
            Self::ReceiveComment => "receive_comment",
            Self::ViewMilestone => "view_milestone",
            Self::CompleteMission => "complete_mission",
            Self::ContentShared => "content_shared",
            Self::DailyLogin => "daily_login",
            Self::PositiveRating => "positive_rating",
        }
    }

    /// Parse a wire name; None for anything outside the closed set
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PublishContent => "Published content",
            Self::ReceiveLike => "Received a like",
            Self::ReceiveComment => "Received a comment",
            Self::ViewMilestone => "Reached a view milestone",
            Self::CompleteMission => "Completed a mission",
            Self::ContentShared => "Content shared",
            Self::DailyLogin => "Daily login",
            Self::PositiveRating => "Positive rating",
        }
    }

    /// Built-in XP reward
    pub fn default_reward(&self) -> u32 {
        match self {
            Self::PublishContent => 50,
            Self::ReceiveLike => 5,
            Self::ReceiveComment => 10,
            Self::ViewMilestone => 100,
            Self::CompleteMission => 20,
            Self::ContentShared => 15,
            Self::DailyLogin => 10,
            Self::PositiveRating => 10,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action kind: {0}")]
pub struct UnknownActionError(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownActionError(s.to_string()))
    }
}

/// Error applying reward overrides from configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardConfigError {
    #[error("Unknown action in reward overrides: {0}")]
    UnknownAction(String),
}

/// Immutable action -> XP mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardTable {
    rewards: HashMap<ActionKind, u32>,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            rewards: ActionKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_reward()))
                .collect(),
        }
    }
}

impl RewardTable {
    /// Defaults with per-action overrides keyed by wire name. A 0 override disables the action.
    pub fn with_overrides(overrides: &HashMap<String, u32>) -> Result<Self, RewardConfigError> {
        let mut table = Self::default();
        for (name, &xp) in overrides {
            let kind = ActionKind::parse(name)
                .ok_or_else(|| RewardConfigError::UnknownAction(name.clone()))?;
            table.rewards.insert(kind, xp);
        }
        Ok(table)
    }

    /// XP for an action, None when the action grants nothing
    pub fn reward(&self, kind: ActionKind) -> Option<u32> {
        self.rewards.get(&kind).copied().filter(|&xp| xp > 0)
    }

    /// All enabled actions in declaration order
    pub fn entries(&self) -> Vec<(ActionKind, u32)> {
        ActionKind::ALL
            .into_iter()
            .filter_map(|kind| self.reward(kind).map(|xp| (kind, xp)))
            .collect()
    }
}
