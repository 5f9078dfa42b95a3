//! Award command implementation

use anyhow::Result;

use xpengine::progression::{AwardOutcome, SkipReason};
use xpengine::ProgressionEngine;

/// Apply one award and print the result
pub async fn award_command(engine: &ProgressionEngine, user: &str, action: &str) -> Result<()> {
    match engine.award(user, action).await? {
        AwardOutcome::Awarded(award) => {
            println!(
                "+{} XP for {} ({}): {} -> {} XP, level {}",
                award.xp,
                award.user_id,
                award.action.label(),
                award.previous_total,
                award.record.total_xp,
                award.record.level
            );
            if let Some(level_up) = &award.level_up {
                println!(
                    "Level up! {} reached level {} (was {})",
                    award.user_id, level_up.new_level, level_up.old_level
                );
            }
            if !award.logged {
                eprintln!("Warning: XP was awarded but the event log entry could not be written");
            }
        }
        AwardOutcome::Skipped(SkipReason::UnknownAction { action }) => {
            eprintln!("Unknown action: {} (no XP awarded)", action);
        }
        AwardOutcome::Skipped(SkipReason::NoReward { action }) => {
            println!("Action {} grants no XP", action);
        }
    }

    Ok(())
}
