//! Simulated clock and date helpers.
//!
//! The app runs on a pregnancy timeline rather than the wall clock: day 0 is
//! 280 days before the due date, and the day index can be overridden to
//! "time travel" for testing and demos. Everything that asks "what day is it"
//! goes through a [`Timeline`].

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

/// Length of the timeline from start to due date.
pub const PREGNANCY_DAYS: i64 = 280;

/// Highest day index the timeline reaches. Later days are clamped to it.
pub const MAX_DAY_INDEX: u32 = 400;

/// A fixed point on the simulated timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub day_index: u32,
    pub effective_date: NaiveDate,
    /// Wall-clock time of day, used to stamp completions on the simulated date.
    pub time_of_day: NaiveTime,
}

impl Timeline {
    /// Timeline at an explicit day index and date.
    pub fn at(effective_date: NaiveDate, day_index: u32) -> Self {
        Timeline {
            day_index,
            effective_date,
            time_of_day: NaiveTime::MIN,
        }
    }

    /// Resolve the timeline for a due date. Without a due date the effective
    /// date is `today` and the day index 0.
    pub fn resolve(due_date: Option<NaiveDate>, today: NaiveDate, day_override: Option<u32>) -> Self {
        let Some(due) = due_date else {
            let day_index = day_override.unwrap_or(0).min(MAX_DAY_INDEX);
            return Timeline::at(today, 0).shifted_to(day_index);
        };
        let start = start_date_from_due(due);
        let day_index = day_override
            .unwrap_or_else(|| day_index_for(start, today))
            .min(MAX_DAY_INDEX);
        Timeline::at(add_days(start, i64::from(day_index)), day_index)
    }

    /// Same clock, moved to another day index.
    pub fn shifted_to(self, day_index: u32) -> Self {
        let delta = i64::from(day_index) - i64::from(self.day_index);
        Timeline {
            day_index,
            effective_date: add_days(self.effective_date, delta),
            time_of_day: self.time_of_day,
        }
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time_of_day = time;
        self
    }

    /// Calendar date of day 0.
    pub fn start_date(&self) -> NaiveDate {
        add_days(self.effective_date, -i64::from(self.day_index))
    }

    /// Calendar date of an arbitrary day index.
    pub fn date_of_day(&self, day: u32) -> NaiveDate {
        add_days(self.start_date(), i64::from(day))
    }

    /// Completion timestamp: the simulated date with the wall-clock time of day.
    pub fn stamp(&self) -> String {
        format!(
            "{}T{:02}:{:02}:{:02}.{:03}Z",
            self.effective_date.format("%Y-%m-%d"),
            self.time_of_day.hour(),
            self.time_of_day.minute(),
            self.time_of_day.second(),
            self.time_of_day.nanosecond() / 1_000_000 % 1000,
        )
    }

    /// Pregnancy week, 1-based and capped at 42.
    pub fn week(&self) -> u32 {
        (1 + self.day_index / 7).min(42)
    }
}

/// Day 0 of the timeline for a due date.
pub fn start_date_from_due(due: NaiveDate) -> NaiveDate {
    add_days(due, -PREGNANCY_DAYS)
}

/// `date` moved by `days`, or `None` past the ends of the calendar.
pub fn checked_add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|d| date.checked_add_signed(d))
}

/// Like [`checked_add_days`] but saturating at `NaiveDate::MIN`/`MAX`.
fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    checked_add_days(date, days).unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Whole days from `start` to `today`, never negative.
pub fn day_index_for(start: NaiveDate, today: NaiveDate) -> u32 {
    (today - start).num_days().clamp(0, i64::from(u32::MAX)) as u32
}

/// Today's calendar date on the wall clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current wall-clock time of day in UTC, for completion stamps.
pub fn now_time() -> NaiveTime {
    Utc::now().time()
}

/// Parse a stored date or timestamp into its calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 (converted to the local calendar day) and
/// naive `YYYY-MM-DDTHH:MM:SS[.fff]`. Anything else is `None`.
pub fn parse_calendar_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Parse human-readable date input relative to the simulated `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - weekday names ("friday", "next monday")
/// - "YYYY-MM-DD"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return checked_add_days(today, 1),
        "yesterday" => return checked_add_days(today, -1),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return checked_add_days(today, days);
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return weeks.checked_mul(7).and_then(|days| checked_add_days(today, days));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
    ];
    let current = i64::from(today.weekday().num_days_from_monday());
    for (name, target) in weekdays {
        let ahead = (target + 7 - current) % 7;
        if s == name {
            return checked_add_days(today, ahead);
        }
        if s == format!("next {}", name) {
            let days = if ahead == 0 { 7 } else { ahead + 7 };
            return checked_add_days(today, days);
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a date relative to the simulated today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resolves_day_index_from_due_date() {
        let due = ymd(2025, 10, 8);
        let start = start_date_from_due(due);
        assert_eq!(start, ymd(2025, 1, 1));
        let tl = Timeline::resolve(Some(due), ymd(2025, 1, 11), None);
        assert_eq!(tl.day_index, 10);
        assert_eq!(tl.effective_date, ymd(2025, 1, 11));
        assert_eq!(tl.start_date(), start);
    }

    #[test]
    fn override_moves_effective_date() {
        let tl = Timeline::resolve(Some(ymd(2025, 10, 8)), ymd(2025, 1, 11), Some(40));
        assert_eq!(tl.effective_date, ymd(2025, 2, 10));
        assert_eq!(tl.date_of_day(0), ymd(2025, 1, 1));
        assert_eq!(tl.week(), 6);
    }

    #[test]
    fn before_start_clamps_to_day_zero() {
        let tl = Timeline::resolve(Some(ymd(2025, 10, 8)), ymd(2024, 12, 1), None);
        assert_eq!(tl.day_index, 0);
        assert_eq!(tl.effective_date, ymd(2025, 1, 1));
    }

    #[test]
    fn day_index_is_clamped() {
        let due = ymd(2025, 10, 8);
        let tl = Timeline::resolve(Some(due), ymd(2025, 1, 11), Some(u32::MAX));
        assert_eq!(tl.day_index, MAX_DAY_INDEX);
        assert_eq!(tl.date_of_day(0), ymd(2025, 1, 1));

        let long_past = Timeline::resolve(Some(ymd(1990, 1, 1)), ymd(2025, 1, 11), None);
        assert_eq!(long_past.day_index, MAX_DAY_INDEX);

        let undated = Timeline::resolve(None, ymd(2025, 1, 11), Some(u32::MAX));
        assert_eq!(undated.day_index, MAX_DAY_INDEX);
    }

    #[test]
    fn calendar_edges_saturate() {
        assert_eq!(start_date_from_due(NaiveDate::MIN), NaiveDate::MIN);
        let tl = Timeline::at(NaiveDate::MAX, 0).shifted_to(10);
        assert_eq!(tl.effective_date, NaiveDate::MAX);
        assert_eq!(checked_add_days(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn stamp_keeps_simulated_date() {
        let tl = Timeline::at(ymd(2025, 3, 4), 5).with_time(NaiveTime::from_hms_milli_opt(9, 8, 7, 6).unwrap());
        assert_eq!(tl.stamp(), "2025-03-04T09:08:07.006Z");
    }

    #[test]
    fn parses_stored_dates() {
        assert_eq!(parse_calendar_day("2025-01-01"), Some(ymd(2025, 1, 1)));
        assert_eq!(parse_calendar_day("2025-01-01T12:00:00"), Some(ymd(2025, 1, 1)));
        assert_eq!(parse_calendar_day("2025-01-01T12:00:00.250"), Some(ymd(2025, 1, 1)));
        assert!(parse_calendar_day("2025-01-01T12:00:00.000Z").is_some());
        assert_eq!(parse_calendar_day("not a date"), None);
        assert_eq!(parse_calendar_day(""), None);
    }

    #[test]
    fn parses_relative_input() {
        let today = ymd(2025, 1, 1); // Wednesday
        assert_eq!(parse_date_input("tomorrow", today), Some(ymd(2025, 1, 2)));
        assert_eq!(parse_date_input("in 3d", today), Some(ymd(2025, 1, 4)));
        assert_eq!(parse_date_input("in 1w", today), Some(ymd(2025, 1, 8)));
        assert_eq!(parse_date_input("friday", today), Some(ymd(2025, 1, 3)));
        assert_eq!(parse_date_input("next wednesday", today), Some(ymd(2025, 1, 8)));
        assert_eq!(parse_date_input("2025-02-01", today), Some(ymd(2025, 2, 1)));
        assert_eq!(parse_date_input("someday", today), None);
        assert_eq!(parse_date_input("in 9999999999999d", today), None);
        assert_eq!(parse_date_input("in 9223372036854775807w", today), None);
    }

    #[test]
    fn relative_format() {
        let today = ymd(2025, 1, 10);
        assert_eq!(format_relative(Some(today), today), "today");
        assert_eq!(format_relative(Some(ymd(2025, 1, 13)), today), "in 3d");
        assert_eq!(format_relative(Some(ymd(2025, 1, 8)), today), "2d late");
        assert_eq!(format_relative(None, today), "-");
    }
}
