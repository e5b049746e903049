//! Read-side projections over the mission history.
//!
//! Week and month buckets are counted from the start of the simulated
//! timeline, never from the wall clock, so they stay consistent when the day
//! index is overridden.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::fields::{ArchiveMode, Category};
use crate::task::Task;
use crate::timeline::{parse_calendar_day, Timeline};

/// Timeline week and month of a history entry. `(0, 0)` when the entry has
/// no usable completion date.
pub fn week_and_month(task: &Task, timeline: &Timeline) -> (u32, u32) {
    let Some(day) = task.completed_date.as_deref().and_then(parse_calendar_day) else {
        return (0, 0);
    };
    let offset = (day - timeline.start_date()).num_days();
    let week = (offset.div_euclid(7) + 1).max(1) as u32;
    let month = week.div_ceil(4).max(1);
    (week, month)
}

/// Filter for the history listing. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub mode: ArchiveMode,
    pub category: Option<Category>,
    pub week: Option<u32>,
    pub month: Option<u32>,
}

impl HistoryFilter {
    pub fn matches(&self, task: &Task, timeline: &Timeline) -> bool {
        let wanted_failed = self.mode == ArchiveMode::Missed;
        if task.failed != wanted_failed {
            return false;
        }
        if let Some(c) = self.category {
            if task.category != c {
                return false;
            }
        }
        if self.week.is_none() && self.month.is_none() {
            return true;
        }
        let (week, month) = week_and_month(task, timeline);
        if let Some(w) = self.week {
            if week != w {
                return false;
            }
        }
        if let Some(m) = self.month {
            if month != m {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, history: &'a [Task], timeline: &Timeline) -> Vec<&'a Task> {
        history.iter().filter(|t| self.matches(t, timeline)).collect()
    }
}

/// Distinct non-zero weeks and months present in the history, ascending.
pub fn available_buckets(history: &[Task], timeline: &Timeline) -> (Vec<u32>, Vec<u32>) {
    let mut weeks = BTreeSet::new();
    let mut months = BTreeSet::new();
    for t in history {
        let (w, m) = week_and_month(t, timeline);
        if w > 0 {
            weeks.insert(w);
        }
        if m > 0 {
            months.insert(m);
        }
    }
    (weeks.into_iter().collect(), months.into_iter().collect())
}

/// Distinct categories present in the history.
pub fn available_categories(history: &[Task]) -> Vec<Category> {
    history.iter().map(|t| t.category).collect::<BTreeSet<_>>().into_iter().collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub count: usize,
    pub xp: u32,
}

impl Tally {
    fn add(&mut self, task: &Task) {
        self.count += 1;
        self.xp += task.points;
    }
}

/// Completion counts relative to the simulated date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Same calendar month as the simulated date.
    pub this_month: Tally,
    /// The seven days up to and including the simulated date.
    pub this_week: Tally,
    pub total: Tally,
}

pub fn summarize<'a>(missions: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Summary {
    let week_ago = today - Duration::days(7);
    let mut summary = Summary::default();
    for t in missions {
        summary.total.add(t);
        let Some(day) = t.completed_date.as_deref().and_then(parse_calendar_day) else {
            continue;
        };
        if day.year() == today.year() && day.month() == today.month() {
            summary.this_month.add(t);
        }
        if day >= week_ago && day <= today {
            summary.this_week.add(t);
        }
    }
    summary
}
