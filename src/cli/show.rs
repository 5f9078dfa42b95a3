//! Show, history, and leaderboard command implementations

use anyhow::Result;

use xpengine::ProgressionEngine;

/// Show a user's level and progress
pub async fn show_command(engine: &ProgressionEngine, user: &str) -> Result<()> {
    let Some((record, progress)) = engine.progress(user).await? else {
        println!("No progression record for {}.", user);
        return Ok(());
    };

    println!("{}", record.user_id);
    println!("  Level:    {}", progress.level);
    println!("  Total XP: {}", record.total_xp);
    match progress.xp_to_next() {
        Some(missing) => println!(
            "  Next:     {} XP to level {} ({:.0}%)",
            missing,
            progress.level + 1,
            progress.progress_to_next() * 100.0
        ),
        None => println!("  Next:     max level reached"),
    }
    println!("  Since:    {}", record.created_at.format("%Y-%m-%d %H:%M"));

    Ok(())
}

/// Show a user's recent XP events
pub async fn history_command(
    engine: &ProgressionEngine,
    user: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let events = engine.history(user, limit).await?;

    if json {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(());
    }

    if events.is_empty() {
        println!("No XP events for {}.", user);
        return Ok(());
    }

    println!("XP events for {} ({}):\n", user, events.len());
    for event in events {
        println!(
            "  {}  +{:<4} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.xp,
            event.action.label()
        );
    }

    Ok(())
}

/// Show the users with the most XP
pub async fn leaderboard_command(engine: &ProgressionEngine, limit: usize) -> Result<()> {
    let ranked = engine.leaderboard(limit).await?;

    if ranked.is_empty() {
        println!("No users yet.");
        return Ok(());
    }

    for (rank, record) in ranked.iter().enumerate() {
        println!(
            "  {:>3}. {:<24} level {:>2}  {:>7} XP",
            rank + 1,
            record.user_id,
            record.level,
            record.total_xp
        );
    }

    Ok(())
}
