//! Task data structures.
//!
//! This module defines the concrete `Task` that lives in a day bucket, its owned
//! `Subtask`s, the `RecurringRule` template that can materialize tasks, and the
//! undated `BacklogItem`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::fields::Frequency;

/// A to-do item scheduled on one calendar day.
///
/// Tasks generated by a recurring rule carry the rule's id in `rule_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub rule_id: Option<u64>,
}

impl Task {
    /// Create an open task with no subtasks.
    pub fn new(id: u64, text: String) -> Self {
        Task {
            id,
            text,
            completed: false,
            time: None,
            tag: None,
            subtasks: Vec::new(),
            rule_id: None,
        }
    }

    /// Case-insensitive match against the task text and its subtasks.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.text.to_lowercase().contains(needle_lower)
            || self
                .subtasks
                .iter()
                .any(|s| s.text.to_lowercase().contains(needle_lower))
    }
}

/// A checklist entry owned by a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A template describing a task that should recur.
///
/// Rules are never edited once created; they are only deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub frequency: Frequency,
}

impl RecurringRule {
    /// Build the concrete task this rule produces on a given day.
    pub fn instantiate(&self, id: u64) -> Task {
        Task {
            id,
            text: self.text.clone(),
            completed: false,
            time: self.time,
            tag: self.tag.clone(),
            subtasks: Vec::new(),
            rule_id: Some(self.id),
        }
    }
}

/// Undated work waiting to be filed into a day.
///
/// Items with a `scheduled_date` are filed automatically once that day arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub scheduled_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
}

impl BacklogItem {
    /// Turn this item into a task, keeping its id.
    pub fn into_task(self) -> Task {
        let mut task = Task::new(self.id, self.text);
        task.time = self.scheduled_time;
        task
    }
}
