//! Enumerations and field types for scheduling.
//!
//! This module defines how often a recurring rule fires and which span of days a
//! view covers.

use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Weekday names indexed by number, Sunday first.
pub const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// How often a recurring rule produces a task.
///
/// Weekdays are numbered 0 = Sunday through 6 = Saturday. A monthly rule fires
/// only on the exact day number, so a rule for the 31st skips shorter months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly {
        #[serde(default)]
        weekdays: BTreeSet<u8>,
    },
    Monthly {
        #[serde(default)]
        day_of_month: u32,
    },
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly { weekdays } => {
                let names: Vec<&str> = weekdays
                    .iter()
                    .map(|&d| WEEKDAY_NAMES.get(d as usize).copied().unwrap_or("?"))
                    .collect();
                write!(f, "weekly on {}", names.join(","))
            }
            Frequency::Monthly { day_of_month } => write!(f, "monthly on day {}", day_of_month),
        }
    }
}

/// Span of days a listing covers, and therefore which days get materialized.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum View {
    Today,
    Week,
    Month,
    /// The visible month plus the following month.
    MonthAhead,
}

/// Parse a weekday list such as `1,3,5` or `mon,wed,fri`.
///
/// Returns `None` if any entry is not recognised.
pub fn parse_weekdays(s: &str) -> Option<BTreeSet<u8>> {
    let mut days = BTreeSet::new();
    for part in s.split(',') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            continue;
        }
        let day = match part.parse::<u8>() {
            Ok(n) if n <= 6 => n,
            Ok(_) => return None,
            Err(_) => {
                let prefix: String = part.chars().take(3).collect();
                WEEKDAY_NAMES.iter().position(|&n| n == prefix)? as u8
            }
        };
        days.insert(day);
    }
    Some(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(parse_weekdays("1,3,5"), Some(BTreeSet::from([1, 3, 5])));
        assert_eq!(parse_weekdays("Mon, wednesday,fri"), Some(BTreeSet::from([1, 3, 5])));
        assert_eq!(parse_weekdays("sun,0"), Some(BTreeSet::from([0])));
        assert_eq!(parse_weekdays("7"), None);
        assert_eq!(parse_weekdays("someday"), None);
    }

    #[test]
    fn test_frequency_json_shape() {
        let weekly = Frequency::Weekly { weekdays: BTreeSet::from([1, 3]) };
        let json = serde_json::to_value(&weekly).unwrap();
        assert_eq!(json["frequency"], "weekly");
        assert_eq!(json["weekdays"], serde_json::json!([1, 3]));

        // Missing weekday set loads as empty rather than failing.
        let loaded: Frequency = serde_json::from_str(r#"{"frequency":"weekly"}"#).unwrap();
        assert_eq!(loaded, Frequency::Weekly { weekdays: BTreeSet::new() });
    }

    #[test]
    fn test_frequency_display() {
        assert_eq!(Frequency::Daily.to_string(), "daily");
        assert_eq!(
            Frequency::Weekly { weekdays: BTreeSet::from([1, 5]) }.to_string(),
            "weekly on mon,fri"
        );
        assert_eq!(Frequency::Monthly { day_of_month: 31 }.to_string(), "monthly on day 31");
    }
}
