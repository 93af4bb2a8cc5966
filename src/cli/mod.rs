//! CLI module for Somna
//!
//! Provides commands over the local sleep record store:
//! - `add`, `list`, `latest`, `delete`: record management
//! - `watch`: follow a live query until Ctrl-C
//! - `stats`, `clear`: data management

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use somna_store::{SleepRepository, SleepStore};
use std::path::PathBuf;

use crate::settings::AppConfig;

pub mod data;
pub mod records;
pub mod watch;

/// Somna sleep history CLI
#[derive(Parser, Debug)]
#[command(name = "somna")]
#[command(about = "Local sleep history store")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides configuration)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a sleep session
    Add(AddArgs),
    /// List stored sessions, newest first
    List {
        /// Only sessions on or after this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: Option<DateTime<Utc>>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent session
    Latest {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete a session by id
    Delete {
        /// Record id
        id: i64,
    },
    /// Print every change to the history until interrupted
    Watch {
        /// Only sessions on or after this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: Option<DateTime<Utc>>,
    },
    /// Show record count and database size
    Stats,
    /// Delete all sessions
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Fields of a new sleep session
#[derive(Args, Debug)]
pub struct AddArgs {
    /// When the session was recorded (RFC 3339, YYYY-MM-DD, or "now")
    #[arg(long, value_parser = parse_date, default_value = "now")]
    pub date: DateTime<Utc>,
    /// Total sleep in hours
    #[arg(long)]
    pub duration: f32,
    /// Quality percentage (estimated from vitals when omitted)
    #[arg(long)]
    pub quality: Option<i32>,
    /// Representative heart rate
    #[arg(long, default_value_t = 0)]
    pub heart_rate: i32,
    /// Steps during the session
    #[arg(long, default_value_t = 0)]
    pub steps: i32,
    /// Deep sleep hours
    #[arg(long, default_value_t = 0.0)]
    pub deep: f32,
    /// Light sleep hours
    #[arg(long, default_value_t = 0.0)]
    pub light: f32,
    /// REM sleep hours
    #[arg(long, default_value_t = 0.0)]
    pub rem: f32,
    /// Replace the record with this id instead of creating a new one
    #[arg(long, default_value_t = 0)]
    pub id: i64,
}

/// Parse a date argument
pub fn parse_date(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{value}': expected RFC 3339, YYYY-MM-DD or 'now'"))
}

/// Open the configured store behind the repository facade
async fn open_repository(
    cli_db: Option<&PathBuf>,
    config: &AppConfig,
) -> Result<SleepRepository<SleepStore>> {
    let store_config = config.store_config(cli_db.map(PathBuf::as_path));
    let store = SleepStore::open(&store_config)
        .await
        .with_context(|| format!("Failed to open {}", store_config.db_path.display()))?;
    Ok(SleepRepository::new(store))
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let repo = open_repository(cli.db.as_ref(), &config).await?;

    match command {
        Commands::Add(args) => records::add(&repo, args).await,
        Commands::List { since, json } => records::list(&repo, since, json).await,
        Commands::Latest { json } => records::latest(&repo, json).await,
        Commands::Delete { id } => records::delete(&repo, id).await,
        Commands::Watch { since } => watch::run(&repo, since).await,
        Commands::Stats => data::stats(&repo).await,
        Commands::Clear { force } => data::clear(&repo, force).await,
    }
}
