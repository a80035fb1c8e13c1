//! Best-effort normalization of schedule cells into calendar dates.
//!
//! A cell either parses as a full date in one of the accepted layouts, or as a
//! `month/day` fragment completed with the reference year. Anything else is
//! absent, which is a normal outcome and not an error.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Full-date layouts tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y. %m. %d",
    "%Y년 %m월 %d일",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Date-time layouts; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Years outside this window are treated as misparses.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2200;

/// Normalize a raw cell into a canonical date.
///
/// `reference_year` only affects `month/day` fragments, so full dates give the
/// same answer for every reference year.
pub fn normalize(raw: Option<&str>, reference_year: i32) -> Option<NaiveDate> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    parse_full_date(value).or_else(|| parse_month_day(value, reference_year))
}

/// Parse a complete date (with year) in any accepted layout.
pub fn parse_full_date(value: &str) -> Option<NaiveDate> {
    // Sheets locale exports "2025. 10. 2." with a trailing dot.
    let value = value.trim().trim_end_matches('.').trim_end();

    // `%Y` accepts "25", so the window is checked per layout to let
    // `%m/%d/%y` pick up short years.
    DATE_FORMATS
        .iter()
        .find_map(|fmt| in_window(NaiveDate::parse_from_str(value, fmt).ok()))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                in_window(NaiveDateTime::parse_from_str(value, fmt).ok().map(|dt| dt.date()))
            })
        })
        .or_else(|| {
            in_window(
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|dt| dt.date_naive()),
            )
        })
}

fn in_window(date: Option<NaiveDate>) -> Option<NaiveDate> {
    date.filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&d.year()))
}

/// Parse a `M/D` fragment as a date in `reference_year`.
fn parse_month_day(value: &str, reference_year: i32) -> Option<NaiveDate> {
    let (month, day) = value.split_once('/')?;
    let month = month.trim().parse::<u32>().ok()?;
    let day = day.trim().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(reference_year, month, day)
}

/// Canonical display form.
pub fn format_canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Current calendar date in `tz`.
///
/// Read once per render cycle so "today" and the reference year agree for
/// every row in that cycle.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
