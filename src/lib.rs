//! xpengine - XP and level progression for creator platforms
//!
//! Users earn experience points (XP) for actions such as publishing content,
//! receiving likes, or completing missions. Cumulative XP maps to a level via
//! ordered thresholds; crossing a threshold produces an explicit level-up
//! signal the surrounding application can celebrate.
//!
//! ## Storage
//!
//! Progression state lives behind the [`progression::store::UserStore`] and
//! [`progression::store::EventLog`] traits. An in-memory backend and a SQLite
//! backend (`~/.xpengine/progress.db`) ship with the crate.

pub mod config;
pub mod progression;

pub use config::Config;
pub use progression::{
    ActionKind, AwardError, AwardOutcome, LevelTable, LevelUp, ProgressionEngine, RewardTable,
    UserId, UserProgression,
};
