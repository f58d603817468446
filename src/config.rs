//! Runtime configuration: where the state lives, what "today" is, and whether
//! recurring tasks are filled in on past days.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::cli::Cli;

/// Environment variable naming the state file.
pub const DB_ENV: &str = "DAYBOOK_DB";
/// Environment variable enabling backfill ("1", "true" or "yes").
pub const BACKFILL_ENV: &str = "DAYBOOK_BACKFILL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub today: NaiveDate,
    pub backfill: bool,
}

impl Config {
    /// Resolve from parsed flags, falling back to the environment and then the
    /// platform data directory.
    pub fn resolve(cli: &Cli) -> Self {
        let db_path = cli
            .db
            .clone()
            .or_else(|| std::env::var_os(DB_ENV).map(PathBuf::from))
            .unwrap_or_else(default_db_path);
        let backfill = cli.backfill
            || std::env::var(BACKFILL_ENV)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);
        Config {
            db_path,
            today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
            backfill,
        }
    }
}

/// `<data dir>/daybook/daybook.json`, or `~/.daybook/daybook.json` when the
/// platform has no data directory.
pub fn default_db_path() -> PathBuf {
    let dir = dirs::data_local_dir()
        .map(|d| d.join("daybook"))
        .or_else(|| dirs::home_dir().map(|h| h.join(".daybook")))
        .unwrap_or_else(|| PathBuf::from(".daybook"));
    dir.join("daybook.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "dbk", "--db", "/tmp/x.json", "--today", "2024-01-03", "--backfill", "stats",
        ])
        .unwrap();
        let config = Config::resolve(&cli);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!(config.backfill);
    }

    // Only test that touches the process environment.
    #[test]
    fn test_env_fallbacks() {
        let bare = Cli::try_parse_from(["dbk", "--today", "2024-01-03", "stats"]).unwrap();

        std::env::set_var(DB_ENV, "/tmp/from-env.json");
        std::env::set_var(BACKFILL_ENV, " Yes ");
        let config = Config::resolve(&bare);
        assert_eq!(config.db_path, PathBuf::from("/tmp/from-env.json"));
        assert!(config.backfill);

        let flagged = Cli::try_parse_from(["dbk", "--db", "/tmp/flag.json", "stats"]).unwrap();
        assert_eq!(Config::resolve(&flagged).db_path, PathBuf::from("/tmp/flag.json"));

        std::env::set_var(BACKFILL_ENV, "0");
        assert!(!Config::resolve(&bare).backfill);

        std::env::remove_var(DB_ENV);
        std::env::remove_var(BACKFILL_ENV);
        let config = Config::resolve(&bare);
        assert_eq!(config.db_path, default_db_path());
        assert!(!config.backfill);
    }

    #[test]
    fn test_default_path_file_name() {
        let path = default_db_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("daybook.json"));
    }
}
