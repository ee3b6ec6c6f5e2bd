//! Calendar arithmetic shared by the slot builder, placement engine and
//! evaluator. Everything operates on plain calendar components
//! ([`NaiveDate`]/[`NaiveTime`]), never on epoch timestamps, so results are
//! stable across DST transitions.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Day of week with `0 = Sunday .. 6 = Saturday`.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Every date in `[start, end]`. Empty when `start > end`.
pub fn enumerate_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        dates.push(cursor);
        cursor += Duration::days(1);
    }
    dates
}

/// The Monday on or before `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// A Monday-anchored week, clipped to the season it was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDefinition {
    pub week_number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekDefinition {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Monday-anchored weeks covering `[start, end]`, numbered from 1. Weeks
/// straddling the boundary are clipped to the range.
pub fn season_weeks(start: NaiveDate, end: NaiveDate) -> Vec<WeekDefinition> {
    let mut weeks = Vec::new();
    if start > end {
        return weeks;
    }

    let mut monday = week_monday(start);
    let mut week_number = 1;
    while monday <= end {
        let sunday = monday + Duration::days(6);
        weeks.push(WeekDefinition {
            week_number,
            start: monday.max(start),
            end: sunday.min(end),
        });
        monday += Duration::days(7);
        week_number += 1;
    }
    weeks
}

/// 1-based game-week number for `date`. Game week 1 anchors on the first
/// Monday on or after `games_start`; admissible dates ahead of that Monday
/// clamp into week 1. `None` for dates before `games_start`.
pub fn game_week_index(date: NaiveDate, games_start: NaiveDate) -> Option<u32> {
    if date < games_start {
        return None;
    }
    let first_monday = if day_of_week(games_start) == 1 {
        games_start
    } else {
        week_monday(games_start) + Duration::days(7)
    };
    if date < first_monday {
        return Some(1);
    }
    Some(((date - first_monday).num_days() / 7) as u32 + 1)
}

/// Minutes since midnight.
pub fn minutes(time: NaiveTime) -> u32 {
    use chrono::Timelike;
    time.hour() * 60 + time.minute()
}

/// Inverse of [`minutes`]. `None` when `total` does not fit in a day.
pub fn time_from_minutes(total: u32) -> Option<NaiveTime> {
    if total >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(total / 60, total % 60, 0)
}

/// `time + delta` minutes, `None` when the result leaves the calendar day.
pub fn add_minutes(time: NaiveTime, delta: u32) -> Option<NaiveTime> {
    time_from_minutes(minutes(time).checked_add(delta)?)
}

pub fn duration_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    (minutes(end) as f64 - minutes(start) as f64) / 60.0
}

/// Half-open interval overlap: `[a1, a2)` intersects `[b1, b2)`.
pub fn times_overlap(a1: NaiveTime, a2: NaiveTime, b1: NaiveTime, b2: NaiveTime) -> bool {
    a1 < b2 && b1 < a2
}

/// Smallest number of minutes separating `[a1, a2)` and `[b1, b2)`;
/// zero when they touch or overlap.
pub fn minutes_between(a1: NaiveTime, a2: NaiveTime, b1: NaiveTime, b2: NaiveTime) -> u32 {
    if times_overlap(a1, a2, b1, b2) {
        return 0;
    }
    if a2 <= b1 {
        minutes(b1) - minutes(a2)
    } else {
        minutes(a1).saturating_sub(minutes(b2))
    }
}

/// Whole days between two dates, always non-negative.
pub fn day_gap(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
