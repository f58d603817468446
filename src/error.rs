//! Error type shared by the state, storage and command layers.

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaybookError>;

#[derive(Debug, Error)]
pub enum DaybookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse state file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no task {id} on {date}")]
    TaskNotFound { date: NaiveDate, id: u64 },

    #[error("no task {0}")]
    UnknownTask(u64),

    #[error("task {task} on {date} has no subtask {id}")]
    SubtaskNotFound { date: NaiveDate, task: u64, id: u64 },

    #[error("no recurring rule {0}")]
    RuleNotFound(u64),

    #[error("no backlog item {0}")]
    BacklogNotFound(u64),

    #[error("task text cannot be empty")]
    EmptyText,

    #[error("invalid recurring rule: {0}")]
    InvalidRule(String),

    #[error("rule {rule} already has a task on {date}")]
    DuplicateOccurrence { date: NaiveDate, rule: u64 },

    #[error("unrecognised date '{0}' (try YYYY-MM-DD, today, tomorrow, mon, next fri, in 3d)")]
    InvalidDate(String),

    #[error("unrecognised time '{0}' (expected HH:MM)")]
    InvalidTime(String),
}
