//! Command implementations for the CLI interface.
//!
//! Each subcommand has a `cmd_*` handler that works on the loaded `Database`.
//! Handlers never read the clock or touch storage; `main` loads the state,
//! runs the handler and saves if anything changed.

use std::io;

use chrono::{NaiveDate, NaiveTime};
use clap::{ArgGroup, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::calendar::{parse_date_input, parse_time_input, view_dates};
use crate::cli::Cli;
use crate::config::Config;
use crate::db::Database;
use crate::error::{DaybookError, Result};
use crate::fields::{parse_weekdays, Frequency, View};
use crate::stats::{achievements, day_stats, day_summary, month_stats, week_stats};
use crate::task::Task;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to a day.
    Add {
        /// What to do.
        text: String,
        /// Day: YYYY-MM-DD, "today", "tomorrow", "fri", "next mon", "in 3d".
        #[arg(long, short)]
        date: Option<String>,
        /// Time of day (HH:MM).
        #[arg(long)]
        time: Option<String>,
        /// Tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show tasks for a day, week or month, filling in recurring tasks first.
    List {
        /// Span to show.
        #[arg(long, value_enum, default_value_t = View::Week)]
        view: View,
        /// Day the view is anchored on (default today).
        #[arg(long, short)]
        date: Option<String>,
        /// Only show tasks with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Hide completed tasks.
        #[arg(long)]
        open: bool,
    },

    /// Toggle a task between done and open.
    Done {
        /// Task ID.
        id: u64,
        /// Day the task is filed under (found automatically if omitted).
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Delete a task.
    Delete {
        /// Task ID.
        id: u64,
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Move a task to another day.
    Move {
        /// Task ID.
        id: u64,
        /// Target day.
        to: String,
        /// Day the task is filed under (found automatically if omitted).
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Manage subtasks.
    Sub {
        #[command(subcommand)]
        action: SubAction,
    },

    /// Find tasks whose text contains a word.
    Search {
        query: String,
    },

    /// Manage recurring rules.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Fill in recurring tasks for a span without listing it.
    Expand {
        #[arg(long, value_enum, default_value_t = View::MonthAhead)]
        view: View,
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Manage the undated backlog.
    Backlog {
        #[command(subcommand)]
        action: BacklogAction,
    },

    /// Completion statistics, streak, points and achievements.
    Stats {
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Mark today as a completed day (streak +1, +50 points).
    CompleteDay,

    /// Print a plain-text summary of a day.
    Summary {
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a subtask.
    Add {
        /// Parent task ID.
        task: u64,
        text: String,
        #[arg(long, short)]
        date: Option<String>,
    },
    /// Toggle a subtask.
    Done {
        /// Parent task ID.
        task: u64,
        /// Subtask ID.
        id: u64,
        #[arg(long, short)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// Create a recurring rule.
    #[command(group(
        ArgGroup::new("frequency").required(true).args(["daily", "weekly", "monthly"])
    ))]
    Add {
        text: String,
        /// Every day.
        #[arg(long)]
        daily: bool,
        /// On these weekdays: "1,3,5" (0 = Sunday) or "mon,wed,fri".
        #[arg(long)]
        weekly: Option<String>,
        /// On this day of the month (1-31). Months without that day are skipped.
        #[arg(long)]
        monthly: Option<u32>,
        /// Time of day (HH:MM).
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// List recurring rules.
    List,
    /// Delete a recurring rule. Tasks it already created are kept.
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum BacklogAction {
    /// Add a backlog item, optionally scheduled for a day.
    Add {
        text: String,
        /// Day the item files itself on.
        #[arg(long, short)]
        date: Option<String>,
        /// Time of day (HH:MM).
        #[arg(long)]
        time: Option<String>,
    },
    /// List backlog items.
    List,
    /// Move a backlog item onto a day.
    Move {
        id: u64,
        /// Target day.
        to: String,
    },
    /// Delete a backlog item.
    Delete {
        id: u64,
    },
}

/// Run a parsed command against the loaded state.
pub fn run(db: &mut Database, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Add { text, date, time, tag } => cmd_add(db, config, text, date, time, tag),
        Commands::List { view, date, tag, open } => cmd_list(db, config, view, date, tag, open),
        Commands::Done { id, date } => cmd_done(db, config, id, date),
        Commands::Delete { id, date } => cmd_delete(db, config, id, date),
        Commands::Move { id, to, date } => cmd_move(db, config, id, to, date),
        Commands::Sub { action } => cmd_sub(db, config, action),
        Commands::Search { query } => cmd_search(db, query),
        Commands::Rule { action } => cmd_rule(db, action),
        Commands::Expand { view, date } => cmd_expand(db, config, view, date),
        Commands::Backlog { action } => cmd_backlog(db, config, action),
        Commands::Stats { date } => cmd_stats(db, config, date),
        Commands::CompleteDay => cmd_complete_day(db, config),
        Commands::Summary { date } => cmd_summary(db, config, date),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn resolve_date(input: Option<&str>, config: &Config) -> Result<NaiveDate> {
    match input {
        Some(s) => parse_date_input(s, config.today),
        None => Ok(config.today),
    }
}

/// Day a task is filed under: the explicit `--date`, or a lookup by id.
fn locate(db: &Database, config: &Config, id: u64, date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => parse_date_input(s, config.today),
        None => db.find_date(id).ok_or(DaybookError::UnknownTask(id)),
    }
}

/// Promote scheduled backlog items and materialize recurring tasks for `dates`.
fn prepare(db: &mut Database, config: &Config, dates: &[NaiveDate]) -> usize {
    db.promote_scheduled_backlog(config.today);
    db.materialize(dates, config.today, config.backfill)
}

/// Add a new task to a day.
pub fn cmd_add(
    db: &mut Database,
    config: &Config,
    text: String,
    date: Option<String>,
    time: Option<String>,
    tag: Option<String>,
) -> Result<()> {
    let date = resolve_date(date.as_deref(), config)?;
    let time = time.as_deref().map(parse_time_input).transpose()?;
    let id = db.add_task(date, &text, time, tag)?;
    println!("Added task {} on {}", id, date);
    Ok(())
}

/// List a view, materializing recurring tasks for every day it shows.
pub fn cmd_list(
    db: &mut Database,
    config: &Config,
    view: View,
    date: Option<String>,
    tag: Option<String>,
    open: bool,
) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), config)?;
    let dates = view_dates(view, anchor);
    prepare(db, config, &dates);

    let tag = tag.as_deref().map(crate::db::normalise_tag);
    let mut shown = 0;
    for &d in &dates {
        let tasks: Vec<&Task> = db
            .bucket(d)
            .iter()
            .filter(|t| !open || !t.completed)
            .filter(|t| tag.is_none() || t.tag == tag)
            .collect();
        if tasks.is_empty() && view != View::Today {
            continue;
        }
        print_day(d, &tasks, config.today);
        shown += tasks.len();
    }
    if shown == 0 && view != View::Today {
        println!("No tasks.");
    }
    Ok(())
}

/// Toggle a task's completion.
pub fn cmd_done(db: &mut Database, config: &Config, id: u64, date: Option<String>) -> Result<()> {
    let date = locate(db, config, id, date.as_deref())?;
    let completed = db.toggle_task(date, id)?;
    println!(
        "Task {} {} ({} points)",
        id,
        if completed { "done" } else { "reopened" },
        db.points
    );
    Ok(())
}

/// Delete a task.
pub fn cmd_delete(db: &mut Database, config: &Config, id: u64, date: Option<String>) -> Result<()> {
    let date = locate(db, config, id, date.as_deref())?;
    let task = db.delete_task(date, id)?;
    println!("Deleted task {}: {}", id, task.text);
    Ok(())
}

/// Move a task to another day.
pub fn cmd_move(
    db: &mut Database,
    config: &Config,
    id: u64,
    to: String,
    date: Option<String>,
) -> Result<()> {
    let from = locate(db, config, id, date.as_deref())?;
    let to = parse_date_input(&to, config.today)?;
    db.move_task(from, id, to)?;
    println!("Moved task {} from {} to {}", id, from, to);
    Ok(())
}

/// Add or toggle subtasks.
pub fn cmd_sub(db: &mut Database, config: &Config, action: SubAction) -> Result<()> {
    match action {
        SubAction::Add { task, text, date } => {
            let date = locate(db, config, task, date.as_deref())?;
            let id = db.add_subtask(date, task, &text)?;
            println!("Added subtask {} to task {}", id, task);
        }
        SubAction::Done { task, id, date } => {
            let date = locate(db, config, task, date.as_deref())?;
            let completed = db.toggle_subtask(date, task, id)?;
            println!("Subtask {} {}", id, if completed { "done" } else { "reopened" });
        }
    }
    Ok(())
}

/// Search task and subtask text.
pub fn cmd_search(db: &Database, query: String) -> Result<()> {
    let hits = db.search(&query);
    if hits.is_empty() {
        println!("No tasks match '{}'.", query);
        return Ok(());
    }
    for (date, task) in hits {
        println!("{}  {}", date, format_task_line(task));
    }
    Ok(())
}

/// Manage recurring rules.
pub fn cmd_rule(db: &mut Database, action: RuleAction) -> Result<()> {
    match action {
        RuleAction::Add { text, daily, weekly, monthly, time, tag } => {
            let frequency = if daily {
                Frequency::Daily
            } else if let Some(days) = weekly {
                let weekdays = parse_weekdays(&days).ok_or_else(|| {
                    DaybookError::InvalidRule(format!("unrecognised weekdays '{}'", days))
                })?;
                Frequency::Weekly { weekdays }
            } else if let Some(day_of_month) = monthly {
                Frequency::Monthly { day_of_month }
            } else {
                return Err(DaybookError::InvalidRule("pick --daily, --weekly or --monthly".into()));
            };
            let time = time.as_deref().map(parse_time_input).transpose()?;
            let id = db.add_rule(&text, time, tag, frequency)?;
            println!("Added rule {}", id);
        }
        RuleAction::List => {
            if db.rules.is_empty() {
                println!("No recurring rules.");
            }
            for r in &db.rules {
                let time =
                    r.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "-".into());
                let tag = r.tag.clone().unwrap_or_else(|| "-".into());
                println!(
                    "{:<5} {:<6} {:<10} {:<24} {}",
                    r.id,
                    time,
                    truncate(&tag, 10),
                    r.frequency.to_string(),
                    r.text
                );
            }
        }
        RuleAction::Delete { id } => {
            let rule = db.delete_rule(id)?;
            println!("Deleted rule {}: {} (existing tasks kept)", id, rule.text);
        }
    }
    Ok(())
}

/// Materialize recurring tasks for a span and report how many were created.
pub fn cmd_expand(
    db: &mut Database,
    config: &Config,
    view: View,
    date: Option<String>,
) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), config)?;
    let dates = view_dates(view, anchor);
    let created = prepare(db, config, &dates);
    println!("Created {} recurring task(s).", created);
    Ok(())
}

/// Add a backlog item. One scheduled for today or earlier is filed straight
/// away; the returned date is the day it landed on.
fn add_backlog_item(
    db: &mut Database,
    config: &Config,
    text: &str,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
) -> Result<(u64, Option<NaiveDate>)> {
    // Older items whose day has come are filed first.
    db.promote_scheduled_backlog(config.today);
    let id = db.add_backlog(text, date, time)?;
    let filed = date.filter(|d| *d <= config.today);
    if filed.is_some() {
        db.promote_scheduled_backlog(config.today);
    }
    Ok((id, filed))
}

/// Manage the backlog.
pub fn cmd_backlog(db: &mut Database, config: &Config, action: BacklogAction) -> Result<()> {
    match action {
        BacklogAction::Add { text, date, time } => {
            let date = date.as_deref().map(|d| parse_date_input(d, config.today)).transpose()?;
            let time = time.as_deref().map(parse_time_input).transpose()?;
            match add_backlog_item(db, config, &text, date, time)? {
                (id, Some(filed)) => println!("Added task {} on {}", id, filed),
                (id, None) => println!("Added backlog item {}", id),
            }
        }
        BacklogAction::List => {
            if db.backlog.is_empty() {
                println!("Backlog is empty.");
            }
            for b in &db.backlog {
                let when = match (b.scheduled_date, b.scheduled_time) {
                    (Some(d), Some(t)) => format!("{} {}", d, t.format("%H:%M")),
                    (Some(d), None) => d.to_string(),
                    (None, Some(t)) => t.format("%H:%M").to_string(),
                    (None, None) => "-".into(),
                };
                println!("{:<5} {:<17} {}", b.id, when, b.text);
            }
        }
        BacklogAction::Move { id, to } => {
            let to = parse_date_input(&to, config.today)?;
            db.move_from_backlog(id, to)?;
            println!("Moved backlog item {} to {}", id, to);
        }
        BacklogAction::Delete { id } => {
            let item = db.delete_backlog(id)?;
            println!("Deleted backlog item {}: {}", id, item.text);
        }
    }
    Ok(())
}

/// Completion statistics and achievements.
pub fn cmd_stats(db: &mut Database, config: &Config, date: Option<String>) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), config)?;
    prepare(db, config, &view_dates(View::Month, anchor));

    let day = day_stats(db, anchor);
    let week = week_stats(db, anchor);
    let month = month_stats(db, anchor);
    println!("{:<8} {:>5}/{:<5} {:>4}%", "Day", day.completed, day.total, day.percentage());
    println!("{:<8} {:>5}/{:<5} {:>4}%", "Week", week.completed, week.total, week.percentage());
    println!("{:<8} {:>5}/{:<5} {:>4}%", "Month", month.completed, month.total, month.percentage());
    println!();
    println!("Streak: {} days", db.streak);
    println!("Points: {}", db.points);
    println!();
    for a in achievements(db, anchor) {
        println!("[{}] {:<16} {}", if a.unlocked { "x" } else { " " }, a.title, a.description);
    }
    Ok(())
}

/// Mark today complete.
pub fn cmd_complete_day(db: &mut Database, config: &Config) -> Result<()> {
    if db.mark_day_complete(config.today) {
        println!("Day complete! Streak {} days, {} points.", db.streak, db.points);
    } else {
        println!("{} is already marked complete.", config.today);
    }
    Ok(())
}

/// Print a day summary.
pub fn cmd_summary(db: &mut Database, config: &Config, date: Option<String>) -> Result<()> {
    let date = resolve_date(date.as_deref(), config)?;
    prepare(db, config, &[date]);
    print!("{}", day_summary(db, date));
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

/// Print one day's bucket under a date header.
pub fn print_day(date: NaiveDate, tasks: &[&Task], today: NaiveDate) {
    let marker = if date == today { "  (today)" } else { "" };
    println!("{} {}{}", date.format("%a"), date, marker);
    if tasks.is_empty() {
        println!("  -");
    }
    for t in tasks {
        println!("  {}", format_task_line(t));
        for s in &t.subtasks {
            println!("        [{}] {} (#{})", if s.completed { "x" } else { " " }, s.text, s.id);
        }
    }
}

/// `[x]    5 09:30 #work  Text (rule 2)`
pub fn format_task_line(t: &Task) -> String {
    let time = t.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
    let tag = t.tag.as_ref().map(|t| format!("#{}", t)).unwrap_or_default();
    let rule = t.rule_id.map(|r| format!(" (rule {})", r)).unwrap_or_default();
    format!(
        "[{}] {:>4} {:<5} {:<10} {}{}",
        if t.completed { "x" } else { " " },
        t.id,
        time,
        truncate(&tag, 10),
        t.text,
        rule
    )
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn config(today: NaiveDate) -> Config {
        Config { db_path: PathBuf::from("unused.json"), today, backfill: false }
    }

    fn parse(args: &[&str]) -> Commands {
        let mut full = vec!["dbk"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap().command
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rule_add_requires_frequency() {
        assert!(Cli::try_parse_from(["dbk", "rule", "add", "Gym"]).is_err());
        let both = ["dbk", "rule", "add", "Gym", "--daily", "--monthly", "3"];
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn test_list_materializes_view() {
        // Monday.
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cfg = config(today);
        let mut db = Database::default();
        let add = parse(&["rule", "add", "Gym", "--weekly", "mon,wed,fri", "--time", "07:00"]);
        run(&mut db, &cfg, add).unwrap();
        run(&mut db, &cfg, parse(&["list", "--view", "week"])).unwrap();

        let gym: Vec<_> = db.days.values().flatten().filter(|t| t.text == "Gym").collect();
        assert_eq!(gym.len(), 3);
        assert!(gym.iter().all(|t| t.time == chrono::NaiveTime::from_hms_opt(7, 0, 0)));

        // Listing again adds nothing.
        let before = db.clone();
        run(&mut db, &cfg, parse(&["list", "--view", "week"])).unwrap();
        assert_eq!(db, before);
    }

    #[test]
    fn test_done_finds_task_without_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cfg = config(today);
        let mut db = Database::default();
        run(&mut db, &cfg, parse(&["add", "Call mum", "--date", "tomorrow"])).unwrap();
        let id = db.bucket(today.succ_opt().unwrap())[0].id;
        let id_arg = id.to_string();
        run(&mut db, &cfg, parse(&["done", id_arg.as_str()])).unwrap();
        assert!(db.bucket(today.succ_opt().unwrap())[0].completed);
        assert_eq!(db.points, 10);
        assert!(matches!(
            run(&mut db, &cfg, parse(&["done", "999"])),
            Err(DaybookError::UnknownTask(999))
        ));
    }

    #[test]
    fn test_backlog_add_for_today_files_immediately() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cfg = config(today);
        let mut db = Database::default();
        let add = parse(&["backlog", "add", "Dentist", "--date", "today", "--time", "15:30"]);
        run(&mut db, &cfg, add).unwrap();
        run(&mut db, &cfg, parse(&["backlog", "add", "Read book"])).unwrap();
        assert_eq!(db.backlog.len(), 1);
        assert_eq!(db.bucket(today)[0].text, "Dentist");
    }

    #[test]
    fn test_backlog_add_undated_reports_backlog_despite_stale_item() {
        let mut db = Database::default();
        let day1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        run(&mut db, &config(day1), parse(&["backlog", "add", "X", "--date", "tomorrow"])).unwrap();
        assert_eq!(db.backlog.len(), 1);

        let (id, filed) = add_backlog_item(&mut db, &config(day2), "Y", None, None).unwrap();
        assert_eq!(filed, None);
        assert_eq!(db.backlog.len(), 1);
        assert_eq!(db.backlog[0].id, id);
        assert_eq!(db.backlog[0].text, "Y");
        assert_eq!(db.bucket(day2)[0].text, "X");

        let (id, filed) = add_backlog_item(&mut db, &config(day2), "Z", Some(day1), None).unwrap();
        assert_eq!(filed, Some(day1));
        assert_eq!(db.bucket(day1)[0].id, id);
        assert_eq!(db.backlog.len(), 1);
    }

    #[test]
    fn test_format_task_line() {
        let mut t = Task::new(5, "Standup".into());
        t.time = chrono::NaiveTime::from_hms_opt(9, 30, 0);
        t.tag = Some("work".into());
        t.rule_id = Some(2);
        assert_eq!(format_task_line(&t), "[ ]    5 09:30 #work      Standup (rule 2)");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
