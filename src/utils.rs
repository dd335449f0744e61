use crate::error::{EnergyForecastError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Accepted month layouts, tried in order before the generic fallback.
/// chrono needs a day to build a date, so each layout is matched against the
/// input with a fixed day appended. chrono's `%b` also matches full month
/// names, so "January-24" is read as Jan-24.
pub const MONTH_FORMATS: [&str; 5] = ["%b-%y", "%b-%Y", "%B, %Y", "%Y-%m", "%Y/%m"];

/// Full-date layouts used by the generic fallback parser.
const FALLBACK_DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

const FALLBACK_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Month-only layouts the fallback accepts in addition to full dates.
const FALLBACK_MONTH_FORMATS: [&str; 6] = ["%B %Y", "%b %Y", "%b %y", "%m/%Y", "%m-%Y", "%Y%m"];

/// Normalizes a month string into the first calendar day of that month.
///
/// The explicit [`MONTH_FORMATS`] always win over the fallback, so ambiguous
/// numeric strings resolve deterministically.
pub fn parse_month(value: &str) -> Result<NaiveDate> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err(EnergyForecastError::InvalidMonthFormat(value.to_string()));
    }

    for fmt in MONTH_FORMATS {
        if let Some(date) = parse_with_day(raw, fmt) {
            return Ok(first_of_month(date));
        }
    }

    parse_month_fallback(raw)
        .map(first_of_month)
        .ok_or_else(|| EnergyForecastError::InvalidMonthFormat(value.to_string()))
}

fn parse_with_day(raw: &str, fmt: &str) -> Option<NaiveDate> {
    let input = format!("{raw}|01");
    let layout = format!("{fmt}|%d");
    NaiveDate::parse_from_str(&input, &layout).ok()
}

fn parse_month_fallback(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    // Month-only layouts go first: "%B %d %Y" would otherwise read
    // "April 2020" as the 20th of April in year 20.
    if let Some(date) = FALLBACK_MONTH_FORMATS
        .iter()
        .find_map(|fmt| parse_with_day(raw, fmt))
    {
        return Some(date);
    }

    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Serializes a canonical month the way every API response shows it ("Jan-24").
pub fn format_month(date: NaiveDate) -> String {
    date.format("%b-%y").to_string()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    add_months(date, 1)
}

/// Shifts a canonical month by `months` (may be negative).
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Every canonical month from `start` to `end` inclusive, one per calendar month.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let start = first_of_month(start);
    let end = first_of_month(end);

    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = next_month_start(current);
    }

    months
}

/// The `count` consecutive months that follow `last`.
pub fn future_months(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (1..=count as i32).map(|i| add_months(last, i)).collect()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
