//! Configuration loading and management

mod io;
mod settings;

pub use io::write_config;
pub use settings::{LevelSettings, StorageSettings, TimeoutSettings};

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::progression::{AwardTimeouts, LevelTable, RewardTable};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database location
    #[serde(default)]
    pub storage: StorageSettings,

    /// Bounds on store and event log calls
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// Level thresholds
    #[serde(default)]
    pub levels: LevelSettings,

    /// Per-action XP overrides keyed by action name (0 disables an action)
    #[serde(default)]
    pub rewards: HashMap<String, u32>,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the reward and level tables can be built
    pub fn validate(&self) -> Result<()> {
        self.reward_table()?;
        self.level_table()?;
        Ok(())
    }

    pub fn reward_table(&self) -> Result<RewardTable> {
        RewardTable::with_overrides(&self.rewards).context("Invalid [rewards] section")
    }

    pub fn level_table(&self) -> Result<LevelTable> {
        match &self.levels.thresholds {
            Some(thresholds) => {
                LevelTable::new(thresholds.clone()).context("Invalid [levels] thresholds")
            }
            None => Ok(LevelTable::default()),
        }
    }

    pub fn award_timeouts(&self) -> AwardTimeouts {
        self.timeouts.to_award_timeouts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ActionKind;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.level_table().unwrap(), LevelTable::default());
        assert_eq!(config.award_timeouts(), AwardTimeouts::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [storage]
            database = "/tmp/xp.db"

            [timeouts]
            store_ms = 500
            log_ms = 250

            [levels]
            thresholds = [0, 10, 20]

            [rewards]
            complete_mission = 25
            daily_login = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.level_table().unwrap().max_level(), 3);
        let rewards = config.reward_table().unwrap();
        assert_eq!(rewards.reward(ActionKind::CompleteMission), Some(25));
        assert_eq!(rewards.reward(ActionKind::DailyLogin), None);
        assert_eq!(
            config.award_timeouts(),
            AwardTimeouts {
                store: Duration::from_millis(500),
                log: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_invalid_sections_are_rejected() {
        assert!(Config::from_toml("[rewards]\nwrite_poem = 5").is_err());
        assert!(Config::from_toml("[levels]\nthresholds = [5, 10]").is_err());
        assert!(Config::from_toml("[timeouts]\nstore_ms = \"fast\"").is_err());
    }
}
