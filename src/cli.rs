use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::cmd::Commands;

/// Day-bucketed task manager with recurring rules, backlog and streaks.
/// State defaults to the platform data directory or a path passed via --db.
#[derive(Parser)]
#[command(name = "dbk", version, about = "Daily task book")]
pub struct Cli {
    /// Path to the JSON state file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today.
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Also fill in recurring tasks on days before today.
    #[arg(long, global = true)]
    pub backfill: bool,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
