use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use xpengine::{Config, ProgressionEngine};

mod cli;

#[derive(Parser)]
#[command(name = "xpengine")]
#[command(about = "XP and level progression for creator platforms")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.xpengine/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the progression database (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Award XP to a user for an action
    Award {
        /// User identifier
        user: String,

        /// Action name (see `xpengine actions`)
        action: String,
    },

    /// Show a user's level and progress
    Show {
        user: String,
    },

    /// Show a user's recent XP events
    History {
        user: String,

        /// Maximum number of events
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show the users with the most XP
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the level threshold table
    Levels,

    /// Print the action reward table
    Actions,

    /// Initialize a new ~/.xpengine/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        config: config_path,
        db,
        command,
        ..
    } = cli;
    let config_path = config_path.as_deref();

    match command {
        Commands::Init { force } => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::global_config_path);
            cli::init::init_command(&path, force)?;
        }
        Commands::Levels => cli::tables::levels_command(&load_config(config_path, db)?)?,
        Commands::Actions => cli::tables::actions_command(&load_config(config_path, db)?)?,
        Commands::Award { user, action } => {
            let engine = open_engine(config_path, db)?;
            cli::award::award_command(&engine, &user, &action).await?;
        }
        Commands::Show { user } => {
            let engine = open_engine(config_path, db)?;
            cli::show::show_command(&engine, &user).await?;
        }
        Commands::History { user, limit, json } => {
            let engine = open_engine(config_path, db)?;
            cli::show::history_command(&engine, &user, limit, json).await?;
        }
        Commands::Leaderboard { limit } => {
            let engine = open_engine(config_path, db)?;
            cli::show::leaderboard_command(&engine, limit).await?;
        }
    }

    Ok(())
}

/// Load the config file, applying the `--db` override
fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(db) = db {
        config.storage.database = Some(db);
    }
    Ok(config)
}

fn open_engine(path: Option<&Path>, db: Option<PathBuf>) -> Result<ProgressionEngine> {
    ProgressionEngine::open(&load_config(path, db)?)
}
