//! XP and Level system
//!
//! Defines level thresholds and the level resolver. A level is always a pure
//! function of cumulative XP: the 1-based rank of the highest threshold not
//! exceeding the total.

use serde::Serialize;

/// Default XP thresholds, one per level (level 1 starts at 0 XP)
pub const DEFAULT_THRESHOLDS: &[u64] = &[0, 100, 250, 500, 750, 1000, 1500, 2000, 3000, 4000, 5000];

/// Error building a level table from custom thresholds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelTableError {
    #[error("Level table must contain at least one threshold")]
    Empty,

    #[error("First level threshold must be 0, got {0}")]
    NonZeroStart(u64),

    #[error("Level thresholds must be strictly ascending ({previous} followed by {next})")]
    NotAscending { previous: u64, next: u64 },
}

/// Ordered XP thresholds mapping cumulative XP to levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl LevelTable {
    /// Build a table from ascending thresholds starting at 0
    pub fn new(thresholds: Vec<u64>) -> Result<Self, LevelTableError> {
        let Some(&first) = thresholds.first() else {
            return Err(LevelTableError::Empty);
        };
        if first != 0 {
            return Err(LevelTableError::NonZeroStart(first));
        }
        for pair in thresholds.windows(2) {
            if pair[1] <= pair[0] {
                return Err(LevelTableError::NotAscending {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self { thresholds })
    }

    /// Resolve the level for a cumulative XP total (always >= 1)
    pub fn level_for(&self, total_xp: u64) -> u32 {
        // Number of thresholds <= total_xp, which is the 1-based rank of the highest one
        let rank = self.thresholds.partition_point(|&t| t <= total_xp);
        u32::try_from(rank).unwrap_or(u32::MAX).max(1)
    }

    /// XP required to reach a level (None if the level does not exist)
    pub fn xp_for_level(&self, level: u32) -> Option<u64> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.thresholds.get(index).copied()
    }

    /// Get XP needed for next level (None if max level)
    pub fn xp_for_next(&self, current_level: u32) -> Option<u64> {
        self.xp_for_level(current_level.checked_add(1)?)
    }

    /// Get max level
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.thresholds.len()).unwrap_or(u32::MAX)
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }
}

/// Progress of a user within the level table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub total_xp: u64,
    pub level: u32,
    /// XP needed for current level
    pub current_level_xp: u64,
    /// XP needed for next level (None if max)
    pub next_level_xp: Option<u64>,
}

impl LevelProgress {
    pub fn new(table: &LevelTable, total_xp: u64) -> Self {
        let level = table.level_for(total_xp);
        Self {
            total_xp,
            level,
            current_level_xp: table.xp_for_level(level).unwrap_or(0),
            next_level_xp: table.xp_for_next(level),
        }
    }

    /// Calculate progress percentage to next level (0.0 - 1.0)
    pub fn progress_to_next(&self) -> f32 {
        match self.next_level_xp {
            Some(next) => {
                let xp_in_level = self.total_xp.saturating_sub(self.current_level_xp);
                let xp_for_level = next.saturating_sub(self.current_level_xp);
                if xp_for_level == 0 {
                    1.0
                } else {
                    (xp_in_level as f32 / xp_for_level as f32).min(1.0)
                }
            }
            None => 1.0,
        }
    }

    /// XP still missing until the next level (None at max level)
    pub fn xp_to_next(&self) -> Option<u64> {
        self.next_level_xp
            .map(|next| next.saturating_sub(self.total_xp))
    }

    pub fn is_max_level(&self) -> bool {
        self.next_level_xp.is_none()
    }
}
