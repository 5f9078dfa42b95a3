//! Settings configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::progression::AwardTimeouts;

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path (defaults to ~/.xpengine/progress.db)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

/// Timeouts for external calls, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Bound on each user store read or write (a timeout fails the award)
    #[serde(default = "default_store_ms")]
    pub store_ms: u64,

    /// Bound on each event log append (a timeout is reported, the award stands)
    #[serde(default = "default_log_ms")]
    pub log_ms: u64,
}

fn default_store_ms() -> u64 {
    2000
}

fn default_log_ms() -> u64 {
    2000
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            store_ms: default_store_ms(),
            log_ms: default_log_ms(),
        }
    }
}

impl TimeoutSettings {
    pub fn to_award_timeouts(&self) -> AwardTimeouts {
        AwardTimeouts {
            store: Duration::from_millis(self.store_ms),
            log: Duration::from_millis(self.log_ms),
        }
    }
}

/// Level table settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    /// Ascending XP thresholds starting at 0; built-in table when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Vec<u64>>,
}
