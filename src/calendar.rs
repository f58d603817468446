//! Date ranges for views and human-friendly date/time input.
//!
//! Nothing here reads the clock; "today" is always passed in.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::error::{DaybookError, Result};
use crate::fields::{View, WEEKDAY_NAMES};

const FULL_WEEKDAY_NAMES: [&str; 7] = [
    "sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
];

/// The seven days of the Sunday-start week containing `date`.
pub fn week_dates(date: NaiveDate) -> Vec<NaiveDate> {
    let start = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
    (0..7).map(|i| start + Duration::days(i)).collect()
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after the one containing `date`.
pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Every day of the month containing `date`.
pub fn month_dates(date: NaiveDate) -> Vec<NaiveDate> {
    first_of_month(date)
        .iter_days()
        .take_while(|d| d.month() == date.month())
        .collect()
}

/// The days a view anchored on `anchor` covers, in order.
pub fn view_dates(view: View, anchor: NaiveDate) -> Vec<NaiveDate> {
    match view {
        View::Today => vec![anchor],
        View::Week => week_dates(anchor),
        View::Month => month_dates(anchor),
        View::MonthAhead => {
            let mut dates = month_dates(anchor);
            dates.extend(month_dates(first_of_next_month(anchor)));
            dates
        }
    }
}

/// Parse a date relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - weekday names ("mon", "friday") for this week's occurrence, today included
/// - "next <weekday>" for the occurrence in the following week
/// - "end of week" (Saturday), "end of month"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return shift(&s, today, Duration::try_days(1)),
        "yesterday" => return shift(&s, today, Duration::try_days(-1)),
        "end of week" | "eow" => {
            return Ok(week_dates(today)[6]);
        }
        "end of month" | "eom" => {
            return Ok(first_of_next_month(today) - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d').and_then(|n| n.trim().parse::<i64>().ok()) {
            return shift(&s, today, Duration::try_days(n));
        }
        if let Some(n) = rest.strip_suffix('w').and_then(|n| n.trim().parse::<i64>().ok()) {
            return shift(&s, today, Duration::try_weeks(n));
        }
    }

    let (next, name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };
    let target = WEEKDAY_NAMES
        .iter()
        .zip(FULL_WEEKDAY_NAMES)
        .position(|(&short, full)| name == short || name == full);
    if let Some(target) = target {
        let current = today.weekday().num_days_from_sunday() as i64;
        let ahead = (target as i64 + 7 - current) % 7;
        let ahead = if next { ahead + 7 } else { ahead };
        return shift(&s, today, Duration::try_days(ahead));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| DaybookError::InvalidDate(s.clone()))
}

/// `today` moved by `delta`; offsets chrono can't represent are invalid input.
fn shift(input: &str, today: NaiveDate, delta: Option<Duration>) -> Result<NaiveDate> {
    delta
        .and_then(|d| today.checked_add_signed(d))
        .ok_or_else(|| DaybookError::InvalidDate(input.to_string()))
}

/// Parse a time of day like `9:30` or `21:05`.
pub fn parse_time_input(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| DaybookError::InvalidTime(s.to_string()))
}
