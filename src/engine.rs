//! Mission lifecycle transitions.
//!
//! Every user action is a [`Command`]. [`apply`] takes the current aggregate
//! and returns a new one plus the [`Event`]s the transition produced; the
//! input is never mutated. A command that does not fit the current state is
//! rejected: the returned state equals the input and the events carry a
//! single [`Event::Rejected`].
//!
//! ```text
//! active    --complete-->  history (failed=false)
//! active    --postpone-->  postponed
//! active    --fail------>  history (failed, manual)
//! postponed --restore--->  custom (restoredCount saturates at 1)
//! history   --restore--->  custom, only while restoredCount == 0
//! active    --sweep----->  history (failed, automatic)
//! custom    --delete---->  gone (custom orders only)
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::catalog::Catalog;
use crate::fields::{Category, Priority};
use crate::rank::{apply_xp, rank_of, Rank, RESTORE_FAILURE_PENALTY};
use crate::stats::{Collection, UserStats};
use crate::task::{Task, MAX_RESTORES};
use crate::timeline::Timeline;

/// XP awarded for a user-created mission.
pub const CUSTOM_MISSION_POINTS: u32 = 50;

/// A user (or system) action against the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Complete { id: String },
    Postpone { id: String },
    Schedule { id: String, date: NaiveDate },
    Restore { id: String, date: NaiveDate },
    Fail { id: String },
    AddCustom { title: String, description: String, scheduled_date: Option<NaiveDate> },
    Delete { id: String },
    /// Materialize missed missions up to the given day index.
    Sweep { day_index: u32 },
}

/// Why a command left the aggregate unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("mission {0} not found")]
    NotFound(String),
    #[error("mission {0} was already restored once")]
    RestoreLimitReached(String),
    #[error("mission {0} was completed and cannot be restored")]
    NotRestorable(String),
    #[error("mission {0} is not a custom order and cannot be deleted")]
    NotCustom(String),
    #[error("mission {0} is already in the history log")]
    AlreadyArchived(String),
    #[error("mission title cannot be empty")]
    EmptyTitle,
    #[error("{0} is already in the past")]
    PastDate(NaiveDate),
    #[error("mission {0} is scheduled for {1}")]
    NotDueYet(String, NaiveDate),
    #[error("mission {0} missed its second chance")]
    Expired(String),
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Completed { id: String, points: u32 },
    RankUp { from: Rank, to: Rank },
    Postponed { id: String },
    Scheduled { id: String, date: NaiveDate },
    Restored { id: String, date: NaiveDate },
    Failed { id: String },
    Added { id: String },
    Deleted { id: String },
    Swept { missed: usize, penalty: u32 },
    /// A restored mission ran out its second chance.
    RestoredMissionFailed(Task),
    Rejected(Rejection),
}

/// New aggregate plus what happened.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: UserStats,
    pub events: Vec<Event>,
}

impl Transition {
    fn unchanged(state: &UserStats, why: Rejection) -> Self {
        debug!(reason = %why, "command rejected");
        Transition {
            state: state.clone(),
            events: vec![Event::Rejected(why)],
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.events.iter().find_map(|e| match e {
            Event::Rejected(r) => Some(r),
            _ => None,
        })
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection().is_some()
    }
}

/// What a transition needs besides the aggregate.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub catalog: &'a Catalog,
    pub timeline: Timeline,
    /// Wall-clock milliseconds, used to mint custom mission ids.
    pub now_millis: i64,
}

pub fn apply(state: &UserStats, command: &Command, ctx: &Context) -> Transition {
    debug!(?command, day = ctx.timeline.day_index, "applying command");
    match command {
        Command::Complete { id } => complete(state, id, ctx),
        Command::Postpone { id } => postpone(state, id, ctx),
        Command::Schedule { id, date } => schedule(state, id, *date, ctx),
        Command::Restore { id, date } => restore(state, id, *date, ctx),
        Command::Fail { id } => fail(state, id, ctx),
        Command::AddCustom { title, description, scheduled_date } => {
            add_custom(state, title, description, *scheduled_date, ctx)
        }
        Command::Delete { id } => delete(state, id),
        Command::Sweep { day_index } => sweep(state, *day_index, ctx),
    }
}

/// Which custom missions an action accepts.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Due {
    /// Only missions in the active view (complete, fail).
    Today,
    /// Also missions planned for a later day (postpone, reschedule).
    Planned,
}

/// Find a mission that can still be acted on. History entries never qualify,
/// and a restored mission past its date only waits for the sweep.
fn find_open(state: &UserStats, id: &str, ctx: &Context, due: Due) -> Result<(Collection, Task), Rejection> {
    let today = ctx.timeline.effective_date;
    match state.locate(id, ctx.catalog, &ctx.timeline) {
        Some((Collection::History, _)) => Err(Rejection::AlreadyArchived(id.to_string())),
        Some((Collection::Custom, task)) => match task.scheduled_date {
            Some(d) if d < today && task.restored_count > 0 => Err(Rejection::Expired(id.to_string())),
            Some(d) if d > today && due == Due::Today => Err(Rejection::NotDueYet(id.to_string(), d)),
            _ => Ok((Collection::Custom, task)),
        },
        Some(found) => Ok(found),
        None => Err(Rejection::NotFound(id.to_string())),
    }
}

fn check_not_past(date: NaiveDate, ctx: &Context) -> Result<(), Rejection> {
    if date < ctx.timeline.effective_date {
        return Err(Rejection::PastDate(date));
    }
    Ok(())
}

/// Take the mission out of every open collection and mark daily ids addressed.
fn detach(next: &mut UserStats, task: &Task) {
    next.custom_missions.retain(|m| m.id != task.id);
    next.postponed_missions.retain(|m| m.id != task.id);
    if task.is_daily_mission() && !next.completed_daily_mission_ids.contains(&task.id) {
        next.completed_daily_mission_ids.push(task.id.clone());
    }
}

/// Re-derive the level after an XP change, reporting a promotion.
fn settle_level(next: &mut UserStats, before: u32, events: &mut Vec<Event>) {
    let old = rank_of(before);
    let new = rank_of(next.points);
    next.level = new.level;
    if new.level > old.level {
        events.push(Event::RankUp { from: old, to: new });
    }
}

fn update_streak(next: &mut UserStats, today: NaiveDate) {
    next.streak = match next.last_engagement_date {
        Some(last) => match (today - last).num_days() {
            0 => next.streak,
            1 => next.streak + 1,
            _ => 1,
        },
        None => 1,
    };
    next.last_engagement_date = Some(today);
}

fn complete(state: &UserStats, id: &str, ctx: &Context) -> Transition {
    let (_, task) = match find_open(state, id, ctx, Due::Today) {
        Ok(found) => found,
        Err(why) => return Transition::unchanged(state, why),
    };

    let mut next = state.clone();
    let mut events = Vec::new();
    detach(&mut next, &task);

    let mut done = task.clone();
    done.completed = true;
    done.failed = false;
    done.manual_fail = false;
    done.completed_date = Some(ctx.timeline.stamp());

    next.points = apply_xp(state.points, i64::from(task.points));
    update_streak(&mut next, ctx.timeline.effective_date);
    next.completed_tasks.push(task.id.clone());
    next.mission_history.insert(0, done);

    events.push(Event::Completed { id: task.id.clone(), points: task.points });
    settle_level(&mut next, state.points, &mut events);
    Transition { state: next, events }
}

fn postpone(state: &UserStats, id: &str, ctx: &Context) -> Transition {
    let (from, task) = match find_open(state, id, ctx, Due::Planned) {
        Ok(found) => found,
        Err(why) => return Transition::unchanged(state, why),
    };
    if from == Collection::Postponed {
        return Transition { state: state.clone(), events: vec![Event::Postponed { id: task.id }] };
    }

    let mut next = state.clone();
    detach(&mut next, &task);
    let mut parked = task;
    parked.scheduled_date = None;
    let id = parked.id.clone();
    next.postponed_missions.push(parked);
    Transition { state: next, events: vec![Event::Postponed { id }] }
}

fn schedule(state: &UserStats, id: &str, date: NaiveDate, ctx: &Context) -> Transition {
    if let Err(why) = check_not_past(date, ctx) {
        return Transition::unchanged(state, why);
    }
    let (_, task) = match find_open(state, id, ctx, Due::Planned) {
        Ok(found) => found,
        Err(why) => return Transition::unchanged(state, why),
    };

    let mut next = state.clone();
    detach(&mut next, &task);
    let mut planned = task;
    planned.scheduled_date = Some(date);
    let id = planned.id.clone();
    next.custom_missions.push(planned);
    Transition { state: next, events: vec![Event::Scheduled { id, date }] }
}

fn restore(state: &UserStats, id: &str, date: NaiveDate, ctx: &Context) -> Transition {
    if let Err(why) = check_not_past(date, ctx) {
        return Transition::unchanged(state, why);
    }
    let (from, task) = match state.locate(id, ctx.catalog, &ctx.timeline) {
        Some(found) => found,
        None => return Transition::unchanged(state, Rejection::NotFound(id.to_string())),
    };
    match from {
        Collection::History if !task.failed => {
            return Transition::unchanged(state, Rejection::NotRestorable(id.to_string()));
        }
        Collection::History if !task.can_restore() => {
            return Transition::unchanged(state, Rejection::RestoreLimitReached(id.to_string()));
        }
        Collection::History | Collection::Postponed => {}
        Collection::ActiveDaily | Collection::Custom => {
            return Transition::unchanged(state, Rejection::NotFound(id.to_string()));
        }
    }

    let mut next = state.clone();
    next.mission_history.retain(|m| m.id != task.id);
    next.postponed_missions.retain(|m| m.id != task.id);

    let mut revived = task;
    revived.scheduled_date = Some(date);
    revived.restored_count = (revived.restored_count + 1).min(MAX_RESTORES);
    revived.failed = false;
    revived.manual_fail = false;
    revived.completed = false;
    revived.completed_date = None;
    revived.priority = Priority::Highest;
    let id = revived.id.clone();
    next.custom_missions.push(revived);
    Transition { state: next, events: vec![Event::Restored { id, date }] }
}

fn fail(state: &UserStats, id: &str, ctx: &Context) -> Transition {
    let (_, task) = match find_open(state, id, ctx, Due::Today) {
        Ok(found) => found,
        Err(why) => return Transition::unchanged(state, why),
    };

    let mut next = state.clone();
    detach(&mut next, &task);
    let mut lost = task;
    lost.completed = false;
    lost.failed = true;
    lost.manual_fail = true;
    lost.completed_date = Some(ctx.timeline.stamp());
    let id = lost.id.clone();
    next.mission_history.insert(0, lost);
    Transition { state: next, events: vec![Event::Failed { id }] }
}

fn add_custom(
    state: &UserStats,
    title: &str,
    description: &str,
    scheduled_date: Option<NaiveDate>,
    ctx: &Context,
) -> Transition {
    let title = title.trim();
    if title.is_empty() {
        return Transition::unchanged(state, Rejection::EmptyTitle);
    }
    if let Some(Err(why)) = scheduled_date.map(|d| check_not_past(d, ctx)) {
        return Transition::unchanged(state, why);
    }

    let mut stamp = ctx.now_millis;
    let ids = state.stored_ids();
    while ids.contains(format!("custom_{}", stamp).as_str()) {
        stamp += 1;
    }

    let mut task = Task::new(format!("custom_{}", stamp), title, CUSTOM_MISSION_POINTS, Category::CustomOrder);
    task.description = description.trim().to_string();
    task.scheduled_date = scheduled_date;

    let mut next = state.clone();
    let id = task.id.clone();
    next.custom_missions.push(task);
    Transition { state: next, events: vec![Event::Added { id }] }
}

fn delete(state: &UserStats, id: &str) -> Transition {
    let task = state
        .custom_missions
        .iter()
        .chain(&state.postponed_missions)
        .find(|t| t.id == id);
    match task {
        None => Transition::unchanged(state, Rejection::NotFound(id.to_string())),
        Some(t) if !t.is_custom() => Transition::unchanged(state, Rejection::NotCustom(id.to_string())),
        Some(_) => {
            let mut next = state.clone();
            next.custom_missions.retain(|m| m.id != id);
            next.postponed_missions.retain(|m| m.id != id);
            Transition { state: next, events: vec![Event::Deleted { id: id.to_string() }] }
        }
    }
}

fn sweep(state: &UserStats, day_index: u32, ctx: &Context) -> Transition {
    let from = state.last_processed_day_index;
    if day_index <= from {
        return Transition { state: state.clone(), events: Vec::new() };
    }

    let timeline = ctx.timeline.shifted_to(day_index);
    let mut next = state.clone();
    let mut events = Vec::new();
    let mut missed = 0usize;

    let addressed: HashSet<&str> = state
        .completed_daily_mission_ids
        .iter()
        .map(String::as_str)
        .chain(state.stored_ids())
        .collect();

    for day in from..day_index {
        let date = timeline.date_of_day(day).format("%Y-%m-%d").to_string();
        for mission in ctx.catalog.missions_for_day(day) {
            if addressed.contains(mission.id.as_str()) {
                continue;
            }
            let mut lost = mission;
            lost.failed = true;
            lost.manual_fail = false;
            lost.completed_date = Some(date.clone());
            next.mission_history.push(lost);
            missed += 1;
        }
    }

    let today = timeline.effective_date;
    let (forfeited, kept): (Vec<Task>, Vec<Task>) = next.custom_missions.drain(..).partition(|m| {
        m.restored_count >= 1 && m.scheduled_date.is_some_and(|d| d < today)
    });
    next.custom_missions = kept;

    let mut penalty = 0u32;
    for mission in forfeited {
        let mut lost = mission;
        lost.completed = false;
        lost.failed = true;
        lost.manual_fail = false;
        lost.completed_date = lost.scheduled_date.map(|d| d.format("%Y-%m-%d").to_string());
        next.points = apply_xp(next.points, -i64::from(RESTORE_FAILURE_PENALTY));
        penalty += RESTORE_FAILURE_PENALTY;
        missed += 1;
        events.push(Event::RestoredMissionFailed(lost.clone()));
        next.mission_history.push(lost);
    }

    next.mission_history.sort_by(|a, b| {
        b.completed_date.as_deref().unwrap_or("").cmp(a.completed_date.as_deref().unwrap_or(""))
    });
    next.level = rank_of(next.points).level;
    next.last_processed_day_index = day_index;

    debug!(from, to = day_index, missed, penalty, "swept missed missions");
    events.insert(0, Event::Swept { missed, penalty });
    Transition { state: next, events }
}
