//! # daybook - Daily task book CLI
//!
//! A command-line personal task manager that files tasks into day buckets, with
//! recurring rules, an undated backlog and a small streak/points game.
//!
//! ## Key Features
//!
//! - **Day Buckets**: every task belongs to exactly one calendar day, in the order it was added
//! - **Recurring Rules**: daily, weekly on a set of weekdays, or monthly on a day number
//! - **Backlog**: undated items, optionally scheduled to file themselves on a given day
//! - **Subtasks, Times and Tags** on any task
//! - **Gamification**: points for completed tasks, streaks for completed days, achievements
//! - **Local File Storage**: the whole state is one JSON file
//!
//! ## Quick Start
//!
//! ```bash
//! # A rule for the gym on Monday, Wednesday and Friday
//! dbk rule add "Gym" --weekly mon,wed,fri --time 07:00
//!
//! # Add a task for tomorrow
//! dbk add "Call the bank" --date tomorrow --tag errands
//!
//! # Show this week (recurring tasks are filled in first)
//! dbk list
//!
//! # Tick a task off
//! dbk done 4
//! ```
//!
//! ## How recurring tasks appear
//!
//! Listing a view fills in one task per due rule per day shown. Running it again
//! never adds a second copy, and deleting a rule keeps the tasks it already
//! made. Days before today are left alone unless `--backfill` is given.
//!
//! State lives in the platform data directory (`~/.local/share/daybook/daybook.json`
//! on Linux) unless `--db` or `DAYBOOK_DB` says otherwise.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod recurrence;
pub mod stats;
pub mod store;
pub mod task;

use cli::Cli;
use cmd::Commands;
use config::Config;
use store::{JsonFileStore, StateStore};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "daybook=debug" } else { "daybook=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Completions don't need any state.
    if let Commands::Completions { shell } = &cli.command {
        cmd::cmd_completions(*shell);
        return;
    }

    let config = Config::resolve(&cli);
    debug!(path = %config.db_path.display(), today = %config.today, "resolved config");

    let store = JsonFileStore::new(&config.db_path);
    let mut db = match store.load() {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load {}: {}", store.path().display(), e);
            std::process::exit(1);
        }
    };
    let before = db.clone();

    if let Err(e) = cmd::run(&mut db, &config, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if db != before {
        if let Err(e) = store.save(&db) {
            eprintln!("Failed to save {}: {}", store.path().display(), e);
            std::process::exit(1);
        }
    }
}
