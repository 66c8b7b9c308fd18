//! As-of date resolution.
//!
//! Weekends roll back to Friday; a weekday before the session close hour
//! counts as the previous session. Exchange holidays are not modelled.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

pub const DEFAULT_SESSION_CLOSE_HOUR: u32 = 16;
pub const DEFAULT_HISTORY_DAYS: u32 = 700;

fn previous_weekday(mut date: NaiveDate) -> NaiveDate {
    loop {
        date -= Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return date;
        }
    }
}

/// Most recent session that had closed by `now` (exchange local time).
pub fn last_completed_session(now: NaiveDateTime, close_hour: u32) -> NaiveDate {
    let today = now.date();
    match today.weekday() {
        Weekday::Sat | Weekday::Sun => previous_weekday(today),
        _ if now.hour() < close_hour => previous_weekday(today),
        _ => today,
    }
}

/// Inclusive `[as_of - history_days, as_of]` fetch range.
pub fn history_window(as_of: NaiveDate, history_days: u32) -> (NaiveDate, NaiveDate) {
    (as_of - Duration::days(i64::from(history_days)), as_of)
}
