//! Completion statistics, achievements and the plain-text day summary.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::calendar::{month_dates, week_dates};
use crate::db::Database;

/// Completion counts over one or more days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayStats {
    pub total: usize,
    pub completed: usize,
}

impl DayStats {
    /// Rounded completion percentage, 0 when there are no tasks.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

pub fn day_stats(db: &Database, date: NaiveDate) -> DayStats {
    range_stats(db, &[date])
}

pub fn range_stats(db: &Database, dates: &[NaiveDate]) -> DayStats {
    dates.iter().fold(DayStats::default(), |acc, &d| {
        let bucket = db.bucket(d);
        DayStats {
            total: acc.total + bucket.len(),
            completed: acc.completed + bucket.iter().filter(|t| t.completed).count(),
        }
    })
}

pub fn week_stats(db: &Database, date: NaiveDate) -> DayStats {
    range_stats(db, &week_dates(date))
}

pub fn month_stats(db: &Database, date: NaiveDate) -> DayStats {
    range_stats(db, &month_dates(date))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
}

/// Achievement board as of `today`.
pub fn achievements(db: &Database, today: NaiveDate) -> Vec<Achievement> {
    let week = week_stats(db, today);
    vec![
        Achievement {
            title: "First step",
            description: "Complete your first task",
            unlocked: db.points >= 10,
        },
        Achievement {
            title: "On a roll",
            description: "Three-day streak",
            unlocked: db.streak >= 3,
        },
        Achievement {
            title: "Week champion",
            description: "Finish 100% of a week",
            unlocked: week.total > 0 && week.percentage() == 100,
        },
        Achievement {
            title: "Point collector",
            description: "Collect 500 points",
            unlocked: db.points >= 500,
        },
    ]
}

/// Plain-text report of a day's done and open tasks.
pub fn day_summary(db: &Database, date: NaiveDate) -> String {
    let bucket = db.bucket(date);
    let (done, open): (Vec<_>, Vec<_>) = bucket.iter().partition(|t| t.completed);
    let stats = day_stats(db, date);

    let mut out = String::new();
    let _ = writeln!(out, "Summary for {}\n", date.format("%d/%m/%Y"));
    if !done.is_empty() {
        let _ = writeln!(out, "Completed ({}):", done.len());
        for t in &done {
            let _ = writeln!(out, "  - {}", t.text);
        }
        out.push('\n');
    }
    if !open.is_empty() {
        let _ = writeln!(out, "Not completed ({}):", open.len());
        for t in &open {
            let _ = writeln!(out, "  - {}", t.text);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Completion: {}%", stats.percentage());
    let _ = writeln!(out, "Streak: {} days", db.streak);
    let _ = writeln!(out, "Points: {}", db.points);
    out
}
