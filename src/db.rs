//! In-memory application state and the operations that mutate it.
//!
//! `Database` holds the day buckets, recurring rules, backlog and gamification
//! counters. It is loaded and saved as a whole through a `StateStore`; nothing
//! in here touches the filesystem or the clock.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DaybookError, Result};
use crate::fields::Frequency;
use crate::recurrence::{expand, IdGenerator, Sequence};
use crate::task::{BacklogItem, RecurringRule, Subtask, Task};

/// Points for completing a task.
pub const TASK_POINTS: u64 = 10;
/// Points for marking a whole day complete.
pub const DAY_POINTS: u64 = 50;

/// Full application state, persisted as one snapshot.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Day buckets keyed by date; order within a bucket is display order.
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, Vec<Task>>,
    #[serde(default)]
    pub rules: Vec<RecurringRule>,
    #[serde(default)]
    pub backlog: Vec<BacklogItem>,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub completed_days: BTreeSet<NaiveDate>,
    #[serde(default, rename = "next_id")]
    pub ids: Sequence,
}

impl Database {
    /// Advance the id counter past every id already in use.
    pub fn reconcile_ids(&mut self) {
        let task_ids = self.days.values().flatten().flat_map(|t| {
            std::iter::once(t.id).chain(t.subtasks.iter().map(|s| s.id))
        });
        let other_ids = self
            .rules
            .iter()
            .map(|r| r.id)
            .chain(self.backlog.iter().map(|b| b.id));
        let max = task_ids.chain(other_ids).max();
        if let Some(max) = max {
            self.ids.observe(max);
        }
    }

    /// Tasks filed under `date`, in display order.
    pub fn bucket(&self, date: NaiveDate) -> &[Task] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get a task by date and id.
    pub fn get(&self, date: NaiveDate, id: u64) -> Option<&Task> {
        self.bucket(date).iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, date: NaiveDate, id: u64) -> Result<&mut Task> {
        self.days
            .get_mut(&date)
            .and_then(|b| b.iter_mut().find(|t| t.id == id))
            .ok_or(DaybookError::TaskNotFound { date, id })
    }

    /// Find the day a task is filed under.
    pub fn find_date(&self, id: u64) -> Option<NaiveDate> {
        self.days
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|t| t.id == id))
            .map(|(date, _)| *date)
    }

    /// Add a task to the end of a day's bucket and return its id.
    pub fn add_task(
        &mut self,
        date: NaiveDate,
        text: &str,
        time: Option<NaiveTime>,
        tag: Option<String>,
    ) -> Result<u64> {
        let text = clean_text(text)?;
        let id = self.ids.next_id();
        let mut task = Task::new(id, text);
        task.time = time;
        task.tag = tag.as_deref().map(normalise_tag).filter(|t| !t.is_empty());
        self.days.entry(date).or_default().push(task);
        Ok(id)
    }

    /// Flip a task's completion flag and adjust points. Returns the new state.
    pub fn toggle_task(&mut self, date: NaiveDate, id: u64) -> Result<bool> {
        let task = self.get_mut(date, id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        if completed {
            self.points += TASK_POINTS;
        } else {
            self.points = self.points.saturating_sub(TASK_POINTS);
        }
        Ok(completed)
    }

    /// Remove a task from its bucket. Empty buckets are dropped.
    pub fn delete_task(&mut self, date: NaiveDate, id: u64) -> Result<Task> {
        let bucket = self
            .days
            .get_mut(&date)
            .ok_or(DaybookError::TaskNotFound { date, id })?;
        let pos = bucket
            .iter()
            .position(|t| t.id == id)
            .ok_or(DaybookError::TaskNotFound { date, id })?;
        let task = bucket.remove(pos);
        if bucket.is_empty() {
            self.days.remove(&date);
        }
        Ok(task)
    }

    /// Re-file a task onto another day, appended at the end.
    ///
    /// A task generated by a rule cannot be moved onto a day that already has a
    /// task from the same rule.
    pub fn move_task(&mut self, from: NaiveDate, id: u64, to: NaiveDate) -> Result<()> {
        if from == to {
            return self
                .get(from, id)
                .map(|_| ())
                .ok_or(DaybookError::TaskNotFound { date: from, id });
        }
        let rule_id = self
            .get(from, id)
            .ok_or(DaybookError::TaskNotFound { date: from, id })?
            .rule_id;
        if let Some(rule) = rule_id {
            if self.bucket(to).iter().any(|t| t.rule_id == Some(rule)) {
                return Err(DaybookError::DuplicateOccurrence { date: to, rule });
            }
        }
        let task = self.delete_task(from, id)?;
        self.days.entry(to).or_default().push(task);
        Ok(())
    }

    /// Add a subtask to a task and return the subtask id.
    pub fn add_subtask(&mut self, date: NaiveDate, task_id: u64, text: &str) -> Result<u64> {
        let text = clean_text(text)?;
        // Look the parent up first so a missing task doesn't burn an id.
        self.get_mut(date, task_id)?;
        let id = self.ids.next_id();
        self.get_mut(date, task_id)?.subtasks.push(Subtask { id, text, completed: false });
        Ok(id)
    }

    /// Flip a subtask's completion flag. Returns the new state.
    pub fn toggle_subtask(&mut self, date: NaiveDate, task_id: u64, id: u64) -> Result<bool> {
        let task = self.get_mut(date, task_id)?;
        let sub = task
            .subtasks
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DaybookError::SubtaskNotFound { date, task: task_id, id })?;
        sub.completed = !sub.completed;
        Ok(sub.completed)
    }

    /// Case-insensitive substring search across every bucket, in date order.
    pub fn search(&self, query: &str) -> Vec<(NaiveDate, &Task)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.days
            .iter()
            .flat_map(|(date, bucket)| bucket.iter().map(move |t| (*date, t)))
            .filter(|(_, t)| t.matches(&needle))
            .collect()
    }

    /// Create a recurring rule and return its id.
    pub fn add_rule(
        &mut self,
        text: &str,
        time: Option<NaiveTime>,
        tag: Option<String>,
        frequency: Frequency,
    ) -> Result<u64> {
        let text = clean_text(text)
            .map_err(|_| DaybookError::InvalidRule("text cannot be empty".into()))?;
        validate_frequency(&frequency)?;
        let id = self.ids.next_id();
        self.rules.push(RecurringRule {
            id,
            text,
            time,
            tag: tag.as_deref().map(normalise_tag).filter(|t| !t.is_empty()),
            frequency,
        });
        Ok(id)
    }

    /// Delete a rule. Tasks it already produced stay where they are.
    pub fn delete_rule(&mut self, id: u64) -> Result<RecurringRule> {
        let pos = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or(DaybookError::RuleNotFound(id))?;
        Ok(self.rules.remove(pos))
    }

    /// Materialize recurring tasks on each of `dates`. Returns how many tasks were
    /// created.
    ///
    /// Dates before `today` are skipped unless `backfill` is set.
    pub fn materialize(&mut self, dates: &[NaiveDate], today: NaiveDate, backfill: bool) -> usize {
        let mut created = 0;
        for &date in dates {
            if date < today && !backfill {
                continue;
            }
            let existing = self.days.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            let new = expand(&self.rules, date, existing, &mut self.ids);
            if new.is_empty() {
                continue;
            }
            created += new.len();
            self.days.entry(date).or_default().extend(new);
        }
        if created > 0 {
            info!(created, "materialized recurring tasks");
        }
        created
    }

    /// Add an item to the backlog and return its id.
    pub fn add_backlog(
        &mut self,
        text: &str,
        scheduled_date: Option<NaiveDate>,
        scheduled_time: Option<NaiveTime>,
    ) -> Result<u64> {
        let text = clean_text(text)?;
        let id = self.ids.next_id();
        self.backlog.push(BacklogItem { id, text, scheduled_date, scheduled_time });
        Ok(id)
    }

    /// Drop a backlog item.
    pub fn delete_backlog(&mut self, id: u64) -> Result<BacklogItem> {
        let pos = self
            .backlog
            .iter()
            .position(|b| b.id == id)
            .ok_or(DaybookError::BacklogNotFound(id))?;
        Ok(self.backlog.remove(pos))
    }

    /// File a backlog item onto a day. The task keeps the item's id.
    pub fn move_from_backlog(&mut self, id: u64, date: NaiveDate) -> Result<()> {
        let item = self.delete_backlog(id)?;
        self.days.entry(date).or_default().push(item.into_task());
        Ok(())
    }

    /// File every backlog item scheduled on or before `today` into its day.
    pub fn promote_scheduled_backlog(&mut self, today: NaiveDate) -> usize {
        let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.backlog)
            .into_iter()
            .partition(|b| b.scheduled_date.is_some_and(|d| d <= today));
        self.backlog = keep;
        let count = due.len();
        for item in due {
            if let Some(date) = item.scheduled_date {
                debug!(id = item.id, %date, "promoting scheduled backlog item");
                self.days.entry(date).or_default().push(item.into_task());
            }
        }
        count
    }

    /// Record `today` as a completed day. Only the first call per date counts.
    pub fn mark_day_complete(&mut self, today: NaiveDate) -> bool {
        if !self.completed_days.insert(today) {
            return false;
        }
        self.streak += 1;
        self.points += DAY_POINTS;
        true
    }
}

fn clean_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DaybookError::EmptyText);
    }
    Ok(text.to_string())
}

/// Reject rules that could never fire. Only applied when a rule is created.
pub fn validate_frequency(frequency: &Frequency) -> Result<()> {
    match frequency {
        Frequency::Daily => Ok(()),
        Frequency::Weekly { weekdays } if weekdays.is_empty() => {
            Err(DaybookError::InvalidRule("weekly rule needs at least one weekday".into()))
        }
        Frequency::Weekly { weekdays } if weekdays.iter().any(|&d| d > 6) => {
            Err(DaybookError::InvalidRule(
                "weekdays are numbered 0 (Sunday) to 6 (Saturday)".into(),
            ))
        }
        Frequency::Weekly { .. } => Ok(()),
        Frequency::Monthly { day_of_month } if !(1..=31).contains(day_of_month) => Err(
            DaybookError::InvalidRule(format!("day of month must be 1-31, got {}", day_of_month)),
        ),
        Frequency::Monthly { .. } => Ok(()),
    }
}

/// Normalize a tag by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().trim_start_matches('#').to_lowercase().replace(' ', "-")
}
