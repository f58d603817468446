//! Recurring rule evaluation and materialization.
//!
//! `is_due` decides whether a rule fires on a date; `expand` turns the due rules
//! into new tasks for a day bucket, skipping rules that already have a task
//! there. Both are pure: the caller supplies the date, the ids and the bucket,
//! and is responsible for appending and saving the result.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fields::Frequency;
use crate::task::{RecurringRule, Task};

/// Source of fresh identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> u64;
}

/// Monotonic counter, persisted with the rest of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    pub fn starting_at(next: u64) -> Self {
        Sequence(next.max(1))
    }

    /// Make sure the counter is past `id`, for state written by hand or by an
    /// older version.
    pub fn observe(&mut self, id: u64) {
        if id >= self.0 {
            self.0 = id.saturating_add(1);
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence::starting_at(1)
    }
}

impl IdGenerator for Sequence {
    fn next_id(&mut self) -> u64 {
        let id = self.0;
        self.0 = self.0.saturating_add(1);
        id
    }
}

/// Whether `rule` fires on `date`.
///
/// Malformed rules (empty weekday set, day number outside the month) are never
/// due rather than an error.
pub fn is_due(rule: &RecurringRule, date: NaiveDate) -> bool {
    match &rule.frequency {
        Frequency::Daily => true,
        Frequency::Weekly { weekdays } => {
            weekdays.contains(&(date.weekday().num_days_from_sunday() as u8))
        }
        Frequency::Monthly { day_of_month } => date.day() == *day_of_month,
    }
}

/// Tasks that must be added to `existing` so every rule due on `date` has
/// exactly one task there.
///
/// Existing tasks are never touched. Expanding again after appending the
/// result returns an empty list.
pub fn expand<G: IdGenerator>(
    rules: &[RecurringRule],
    date: NaiveDate,
    existing: &[Task],
    ids: &mut G,
) -> Vec<Task> {
    let mut created: Vec<Task> = Vec::new();
    for rule in rules.iter().filter(|r| is_due(r, date)) {
        let present = existing
            .iter()
            .chain(created.iter())
            .any(|t| t.rule_id == Some(rule.id));
        if present {
            continue;
        }
        created.push(rule.instantiate(ids.next_id()));
    }
    if !created.is_empty() {
        debug!(%date, count = created.len(), "materialized recurring tasks");
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(id: u64, text: &str, frequency: Frequency) -> RecurringRule {
        RecurringRule { id, text: text.into(), time: None, tag: None, frequency }
    }

    fn gym() -> RecurringRule {
        rule(7, "Gym", Frequency::Weekly { weekdays: BTreeSet::from([1, 3, 5]) })
    }

    #[test]
    fn test_daily_always_due() {
        let r = rule(1, "Water plants", Frequency::Daily);
        let mut d = date(2024, 1, 1);
        for _ in 0..400 {
            assert!(is_due(&r, d));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_weekly_matches_weekday_set() {
        let r = gym();
        let mut d = date(2024, 1, 1);
        for _ in 0..28 {
            let wd = d.weekday().num_days_from_sunday();
            assert_eq!(is_due(&r, d), matches!(wd, 1 | 3 | 5), "{d}");
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_weekly_empty_set_never_due() {
        let r = rule(1, "Nothing", Frequency::Weekly { weekdays: BTreeSet::new() });
        let mut d = date(2024, 1, 1);
        for _ in 0..7 {
            assert!(!is_due(&r, d));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_monthly_exact_day_no_rollover() {
        let r = rule(1, "Pay rent", Frequency::Monthly { day_of_month: 31 });
        assert!(!is_due(&r, date(2024, 4, 30)));
        assert!(is_due(&r, date(2024, 5, 31)));
        assert!(!is_due(&r, date(2024, 5, 30)));
        assert!(!is_due(&r, date(2024, 2, 29)));
    }

    #[test]
    fn test_monthly_out_of_range_never_due() {
        let zero = rule(1, "Zero", Frequency::Monthly { day_of_month: 0 });
        let big = rule(2, "Big", Frequency::Monthly { day_of_month: 40 });
        let mut d = date(2024, 1, 1);
        for _ in 0..366 {
            assert!(!is_due(&zero, d));
            assert!(!is_due(&big, d));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_expand_weekly_on_tuesday_is_empty() {
        let mut ids = Sequence::default();
        // 2024-01-02 is a Tuesday.
        let out = expand(&[gym()], date(2024, 1, 2), &[], &mut ids);
        assert!(out.is_empty());
    }

    #[test]
    fn test_expand_weekly_on_monday_creates_one() {
        let mut ids = Sequence::starting_at(100);
        // 2024-01-01 is a Monday.
        let out = expand(&[gym()], date(2024, 1, 1), &[], &mut ids);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Gym");
        assert_eq!(out[0].rule_id, Some(7));
        assert_eq!(out[0].id, 100);
        assert!(!out[0].completed);
        assert!(out[0].subtasks.is_empty());
    }

    #[test]
    fn test_expand_copies_time_and_tag() {
        let mut r = rule(3, "Standup", Frequency::Daily);
        r.time = chrono::NaiveTime::from_hms_opt(9, 30, 0);
        r.tag = Some("work".into());
        let out = expand(&[r], date(2024, 3, 4), &[], &mut Sequence::default());
        assert_eq!(out[0].time, chrono::NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(out[0].tag.as_deref(), Some("work"));
    }

    #[test]
    fn test_expand_is_idempotent() {
        let rules = vec![
            rule(1, "Daily", Frequency::Daily),
            gym(),
            rule(2, "Monthly", Frequency::Monthly { day_of_month: 1 }),
        ];
        let d = date(2024, 1, 1);
        let mut ids = Sequence::default();
        let mut bucket = vec![Task::new(50, "Manual".into())];

        let first = expand(&rules, d, &bucket, &mut ids);
        assert_eq!(first.len(), 3);
        bucket.extend(first);

        let second = expand(&rules, d, &bucket, &mut ids);
        assert!(second.is_empty());
        assert_eq!(bucket.len(), 4);
        assert_eq!(bucket[0].text, "Manual");
    }

    #[test]
    fn test_expand_skips_completed_existing_instance() {
        let r = rule(1, "Read", Frequency::Daily);
        let mut done = r.instantiate(9);
        done.completed = true;
        let out = expand(&[r], date(2024, 1, 1), &[done], &mut Sequence::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_expand_duplicate_rule_ids_materialize_once() {
        let rules = vec![rule(4, "A", Frequency::Daily), rule(4, "A again", Frequency::Daily)];
        let out = expand(&rules, date(2024, 1, 1), &[], &mut Sequence::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_sequence_observe() {
        let mut seq = Sequence::default();
        seq.observe(41);
        assert_eq!(seq.next_id(), 42);
        seq.observe(10);
        assert_eq!(seq.next_id(), 43);
    }

    #[test]
    fn test_sequence_observe_max_id_saturates() {
        let mut seq = Sequence::default();
        seq.observe(u64::MAX);
        assert_eq!(seq, Sequence::starting_at(u64::MAX));
        assert_eq!(seq.next_id(), u64::MAX);
        assert_eq!(seq, Sequence::starting_at(u64::MAX));
    }
}
