//! Header data derived from the displayed month: the title, the weekday
//! column headers and the optional week number column.

use crate::model::{MonthGrid, WeekDay};
use chrono::{DateTime, Datelike, Duration, Locale, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeSet;

const TITLE_FORMAT: &str = "%b %Y";

fn localized(date: NaiveDate, fmt: &str, locale: Locale) -> String {
    let dt: DateTime<Utc> = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    dt.format_localized(fmt, locale).to_string()
}

/// Upper-cases the first letter, as month names are shown at the start of
/// a sentence.
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "Oct 2026" style title for the month containing `month_start`.
pub fn month_title(month_start: NaiveDate, locale: Locale) -> String {
    capitalize_first(&localized(month_start, TITLE_FORMAT, locale))
}

/// Single letter symbol for a weekday, 0 = Sunday.
pub fn very_short_weekday_symbol(index: u8, locale: Locale) -> String {
    // 2023-01-01 was a Sunday
    let Some(sunday) = NaiveDate::from_ymd_opt(2023, 1, 1) else {
        return String::new();
    };
    let day = sunday + Duration::days(i64::from(index % 7));
    let abbreviated = localized(day, "%a", locale);

    abbreviated
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// The seven column headers starting at `first_weekday`.
pub fn weekday_headers(
    first_weekday: u8,
    highlighted: &BTreeSet<u8>,
    locale: Locale,
) -> Vec<WeekDay> {
    (0..7u8)
        .map(|offset| {
            let index = (first_weekday % 7 + offset) % 7;
            WeekDay {
                title: very_short_weekday_symbol(index, locale),
                is_highlighted: highlighted.contains(&index),
                index,
            }
        })
        .collect()
}

/// ISO week number of the first cell of each displayed row, or `None` when
/// week numbers are turned off.
pub fn week_numbers(show: bool, grid: &MonthGrid) -> Option<Vec<u32>> {
    if !show {
        return None;
    }

    Some(
        grid.weeks()
            .filter_map(|week| week.first())
            .map(|cell| cell.date.iso_week().week())
            .collect(),
    )
}
