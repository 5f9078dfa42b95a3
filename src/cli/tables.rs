//! Level and reward table commands

use anyhow::Result;

use xpengine::Config;

/// Print the level threshold table
pub fn levels_command(config: &Config) -> Result<()> {
    let table = config.level_table()?;

    println!("Levels ({}):\n", table.max_level());
    for (index, threshold) in table.thresholds().iter().enumerate() {
        println!("  Level {:>2}  {:>6} XP", index + 1, threshold);
    }

    Ok(())
}

/// Print the action reward table
pub fn actions_command(config: &Config) -> Result<()> {
    let rewards = config.reward_table()?;

    for (kind, xp) in rewards.entries() {
        println!("  {:<18} {:>4} XP  {}", kind.as_str(), xp, kind.label());
    }

    Ok(())
}
