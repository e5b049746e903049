//! Inactivity ("deserter") evaluation.
//!
//! A user who has completed at least one mission and then goes a full week
//! without any activity is shown the deserter pseudo-rank until they come
//! back. Auto-failed missions are inactivity and never reset the clock.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::task::Task;
use crate::timeline::parse_calendar_day;

/// Days of inactivity at which the penalty kicks in (inclusive).
pub const DESERTER_THRESHOLD_DAYS: i64 = 7;

/// Evaluate the deserter state.
///
/// `history` is newest-first. `today` is the wall-clock day used when neither
/// an activity anchor nor an account creation date exists. Any date that fails
/// to parse yields `false`.
pub fn is_deserter(
    history: &[Task],
    account_created: Option<&str>,
    effective_date: &str,
    today: NaiveDate,
) -> bool {
    if !history.iter().any(|t| !t.failed) {
        return false;
    }

    let Some(now) = parse_calendar_day(effective_date) else {
        warn!(effective_date, "unparseable effective date, skipping deserter check");
        return false;
    };

    let anchor = match history.iter().find(|t| t.is_activity()) {
        Some(last) => last.completed_date.as_deref().or(account_created),
        None => account_created,
    };

    let anchor_day = match anchor {
        None => today,
        Some(raw) => match parse_calendar_day(raw) {
            Some(d) => d,
            None => {
                warn!(date = raw, "unparseable activity date, skipping deserter check");
                return false;
            }
        },
    };

    let gap = (now - anchor_day).num_days();
    debug!(%anchor_day, %now, gap, "deserter check");
    gap >= DESERTER_THRESHOLD_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Category;

    fn done(id: &str, date: &str) -> Task {
        let mut t = Task::new(id, id, 10, Category::Service);
        t.completed = true;
        t.completed_date = Some(date.to_string());
        t
    }

    fn auto_failed(id: &str, date: &str) -> Task {
        let mut t = done(id, date);
        t.completed = false;
        t.failed = true;
        t
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seven_day_gap_is_inclusive() {
        let history = vec![done("a", "2025-01-01")];
        assert!(is_deserter(&history, None, "2025-01-08", day(2025, 1, 8)));
        assert!(!is_deserter(&history, None, "2025-01-07", day(2025, 1, 7)));
    }

    #[test]
    fn never_completed_is_never_deserter() {
        let history = vec![auto_failed("a", "2024-01-01")];
        assert!(!is_deserter(&history, Some("2023-01-01"), "2025-01-01", day(2025, 1, 1)));
        assert!(!is_deserter(&[], Some("2023-01-01"), "2025-01-01", day(2025, 1, 1)));
    }

    #[test]
    fn auto_failures_do_not_reset_the_clock() {
        let history = vec![
            auto_failed("c", "2025-01-09"),
            auto_failed("b", "2025-01-05"),
            done("a", "2025-01-01"),
        ];
        assert!(is_deserter(&history, None, "2025-01-10", day(2025, 1, 10)));
    }

    #[test]
    fn manual_failures_count_as_activity() {
        let mut manual = auto_failed("b", "2025-01-06");
        manual.manual_fail = true;
        let history = vec![manual, done("a", "2025-01-01")];
        assert!(!is_deserter(&history, None, "2025-01-10", day(2025, 1, 10)));
    }

    #[test]
    fn missing_completion_date_falls_back_to_account_creation() {
        let mut t = done("a", "x");
        t.completed_date = None;
        let history = vec![t];
        assert!(is_deserter(&history, Some("2025-01-01"), "2025-01-08", day(2025, 1, 8)));
        assert!(!is_deserter(&history, Some("2025-01-05"), "2025-01-08", day(2025, 1, 8)));
    }

    #[test]
    fn no_anchor_at_all_uses_today() {
        let mut t = done("a", "x");
        t.completed_date = None;
        let history = vec![t];
        assert!(is_deserter(&history, None, "2025-01-20", day(2025, 1, 10)));
        assert!(!is_deserter(&history, None, "2025-01-12", day(2025, 1, 10)));
    }

    #[test]
    fn bad_dates_fail_safe() {
        let history = vec![done("a", "garbage")];
        assert!(!is_deserter(&history, None, "2030-01-01", day(2030, 1, 1)));
        let history = vec![done("a", "2025-01-01")];
        assert!(!is_deserter(&history, None, "not-a-date", day(2030, 1, 1)));
    }
}
