use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::config::Freq;
use crate::constants::metrics::TIMESTAMP_FORMATS;

/// Parse a trip timestamp in any layout seen across schema revisions.
///
/// Accepts ISO dates with a space or `T` separator, optional seconds and
/// fractional seconds, and US `m/d/Y` dates. Returns `None` when no layout
/// matches.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Label of the `freq` bucket containing `ts`.
///
/// Minute, hour, and day buckets are labelled by their start. Month-end and
/// year-end buckets are labelled by midnight of their last calendar day.
pub fn bucket_label(freq: Freq, ts: NaiveDateTime) -> NaiveDateTime {
    let date = ts.date();
    match freq {
        Freq::Minute => midnight(date) + Duration::minutes(i64::from(ts.hour() * 60 + ts.minute())),
        Freq::Hour => midnight(date) + Duration::hours(i64::from(ts.hour())),
        Freq::Day => midnight(date),
        Freq::MonthEnd => midnight(last_day_of_month(date.year(), date.month())),
        Freq::YearEnd => midnight(last_day_of_month(date.year(), 12)),
    }
}

/// Label of the bucket immediately after the bucket labelled `label`.
pub fn next_bucket_label(freq: Freq, label: NaiveDateTime) -> NaiveDateTime {
    match freq {
        Freq::Minute => label + Duration::minutes(1),
        Freq::Hour => label + Duration::hours(1),
        Freq::Day => label + Duration::days(1),
        Freq::MonthEnd => {
            let (year, month) = if label.month() == 12 {
                (label.year() + 1, 1)
            } else {
                (label.year(), label.month() + 1)
            };
            midnight(last_day_of_month(year, month))
        }
        Freq::YearEnd => midnight(last_day_of_month(label.year() + 1, 12)),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
