//! Init command implementation

use anyhow::{bail, Result};
use std::path::Path;

use xpengine::Config;

/// Default configuration content for xpengine init
pub const DEFAULT_CONFIG: &str = r#"# xpengine configuration
# =======================

# ============================================================================
# STORAGE
# ============================================================================
#
#   database - SQLite file holding user progression and the XP event log
#              (default: ~/.xpengine/progress.db)

[storage]
# database = "~/.xpengine/progress.db"

# ============================================================================
# TIMEOUTS - Bounds on each external call, in milliseconds
# ============================================================================
#
#   store_ms - user store read/write; a timeout fails the award
#   log_ms   - event log append; a timeout is reported but the award stands

[timeouts]
store_ms = 2000
log_ms = 2000

# ============================================================================
# LEVELS - Ascending XP thresholds, one per level, starting at 0
# ============================================================================

[levels]
thresholds = [0, 100, 250, 500, 750, 1000, 1500, 2000, 3000, 4000, 5000]

# ============================================================================
# REWARDS - Per-action XP overrides (0 disables an action)
# ============================================================================
#
# Actions: publish_content, receive_like, receive_comment, view_milestone,
#          complete_mission, content_shared, daily_login, positive_rating

[rewards]
# publish_content = 50
# complete_mission = 20
"#;

/// Write the default config file
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    // Never write a file we could not load back
    Config::from_toml(DEFAULT_CONFIG)?;

    xpengine::config::write_config(config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}
