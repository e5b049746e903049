//! The `UserStats` aggregate and its read-side queries.
//!
//! One aggregate per user. It owns the four disjoint mission collections:
//!
//! - **active daily**: derived from the catalogue for the current day, minus
//!   anything already addressed,
//! - **custom** (`customMissions`), including restored and scheduled tasks,
//! - **postponed** (`postponedMissions`), the backlog,
//! - **history** (`missionHistory`), newest first, completed or failed.
//!
//! Fields the engine does not interpret (checklists, budget plan, medical
//! info, ...) are kept in `extra` and written back untouched.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::Catalog;
use crate::rank::{progression, Progression};
use crate::task::Task;
use crate::timeline::Timeline;

pub const DEFAULT_PARTNER_NAME: &str = "Velitelka";

/// Which collection a mission currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    ActiveDaily,
    Custom,
    Postponed,
    History,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_partner_name")]
    pub partner_name: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_engagement_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_created: Option<String>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub completed_daily_mission_ids: Vec<String>,
    #[serde(default)]
    pub custom_missions: Vec<Task>,
    #[serde(default)]
    pub postponed_missions: Vec<Task>,
    #[serde(default)]
    pub mission_history: Vec<Task>,
    #[serde(default)]
    pub last_processed_day_index: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_partner_name() -> String {
    DEFAULT_PARTNER_NAME.to_string()
}

fn default_level() -> u32 {
    1
}

impl Default for UserStats {
    fn default() -> Self {
        UserStats {
            email: String::new(),
            partner_name: default_partner_name(),
            points: 0,
            level: default_level(),
            streak: 0,
            last_engagement_date: None,
            user_name: None,
            due_date: None,
            account_created: None,
            completed_tasks: Vec::new(),
            completed_daily_mission_ids: Vec::new(),
            custom_missions: Vec::new(),
            postponed_missions: Vec::new(),
            mission_history: Vec::new(),
            last_processed_day_index: 0,
            extra: default_data_bags(),
        }
    }
}

/// Defaults for the UI data bags the engine carries but never reads.
pub fn default_data_bags() -> Map<String, Value> {
    let defaults = json!({
        "badges": [],
        "logs": [],
        "timeCapsule": [],
        "gearChecklist": [],
        "hospitalBagChecklist": [],
        "operationalPrepChecklist": [],
        "customGear": [],
        "babyNames": [],
        "backupContacts": [],
        "bloodPressureLog": [],
        "visitorStatus": "bunker",
        "gbsStatus": "unknown",
        "budgetPlan": {
            "totalBudget": 50000,
            "stroller": 0,
            "carSeat": 0,
            "furniture": 0,
            "clothes": 0,
            "cosmetics": 0,
            "other": 0
        }
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl UserStats {
    /// A fresh aggregate for a newly registered user.
    pub fn new(email: &str, account_created: String) -> Self {
        UserStats {
            email: email.to_string(),
            account_created: Some(account_created),
            ..UserStats::default()
        }
    }

    /// Fill any missing UI data bag with its default.
    pub fn ensure_data_bags(&mut self) {
        for (key, value) in default_data_bags() {
            self.extra.entry(key).or_insert(value);
        }
    }

    /// Rank standing for the current point total.
    pub fn progression(&self, deserter: bool) -> Progression {
        progression(self.points, deserter)
    }

    /// True once the mission id has left the active daily view.
    pub fn is_addressed(&self, id: &str) -> bool {
        self.completed_daily_mission_ids.iter().any(|d| d == id)
            || self.postponed_missions.iter().any(|t| t.id == id)
            || self.custom_missions.iter().any(|t| t.id == id)
            || self.mission_history.iter().any(|t| t.id == id)
    }

    /// Today's catalogue missions that still need attention.
    pub fn active_daily(&self, catalog: &Catalog, timeline: &Timeline) -> Vec<Task> {
        catalog
            .missions_for_day(timeline.day_index)
            .into_iter()
            .filter(|t| !self.is_addressed(&t.id))
            .collect()
    }

    /// Custom missions due today: unscheduled, scheduled for today, or
    /// overdue but never restored.
    pub fn active_custom(&self, timeline: &Timeline) -> Vec<&Task> {
        let today = timeline.effective_date;
        self.custom_missions
            .iter()
            .filter(|t| {
                if t.failed {
                    return false;
                }
                match t.scheduled_date {
                    None => true,
                    Some(d) if d == today => true,
                    Some(d) if d < today => t.restored_count == 0,
                    Some(_) => false,
                }
            })
            .collect()
    }

    /// Everything shown in the active tab, daily first.
    pub fn active_missions(&self, catalog: &Catalog, timeline: &Timeline) -> Vec<Task> {
        let mut out = self.active_daily(catalog, timeline);
        out.extend(self.active_custom(timeline).into_iter().cloned());
        out
    }

    /// Custom missions scheduled for a later day.
    pub fn upcoming(&self, timeline: &Timeline) -> Vec<&Task> {
        let today = timeline.effective_date;
        let mut out: Vec<&Task> = self
            .custom_missions
            .iter()
            .filter(|t| !t.failed && t.scheduled_date.is_some_and(|d| d > today))
            .collect();
        out.sort_by_key(|t| t.scheduled_date);
        out
    }

    /// Locate a mission among the collections.
    pub fn locate(&self, id: &str, catalog: &Catalog, timeline: &Timeline) -> Option<(Collection, Task)> {
        if let Some(t) = self.custom_missions.iter().find(|t| t.id == id) {
            return Some((Collection::Custom, t.clone()));
        }
        if let Some(t) = self.postponed_missions.iter().find(|t| t.id == id) {
            return Some((Collection::Postponed, t.clone()));
        }
        if let Some(t) = self.mission_history.iter().find(|t| t.id == id) {
            return Some((Collection::History, t.clone()));
        }
        self.active_daily(catalog, timeline)
            .into_iter()
            .find(|t| t.id == id)
            .map(|t| (Collection::ActiveDaily, t))
    }

    /// Number of stored collections holding `id`. Always 0 or 1.
    pub fn occurrences(&self, id: &str) -> usize {
        [
            &self.custom_missions,
            &self.postponed_missions,
            &self.mission_history,
        ]
        .iter()
        .map(|list| list.iter().filter(|t| t.id == id).count())
        .sum()
    }

    /// Ids of every stored mission, for invariant checks.
    pub fn stored_ids(&self) -> HashSet<&str> {
        self.custom_missions
            .iter()
            .chain(&self.postponed_missions)
            .chain(&self.mission_history)
            .map(|t| t.id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Category;

    fn tl(day: u32) -> Timeline {
        Timeline::at(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 0).shifted_to(day)
    }

    fn custom(id: &str, date: Option<&str>) -> Task {
        let mut t = Task::new(id, id, 50, Category::CustomOrder);
        t.scheduled_date = date.map(|d| d.parse().unwrap());
        t
    }

    #[test]
    fn loads_partial_client_blob_and_keeps_unknown_fields() {
        let raw = r#"{"email":"a@b.cz","points":120,"dueDate":"2025-10-08","lastEngagementDate":null,
            "gearChecklist":["g1"],"medicalInfo":{"bloodType":"A+"}}"#;
        let stats: UserStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.points, 120);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.partner_name, DEFAULT_PARTNER_NAME);
        assert!(stats.mission_history.is_empty());
        assert_eq!(stats.extra["gearChecklist"], json!(["g1"]));

        let back = serde_json::to_value(&stats).unwrap();
        assert_eq!(back["medicalInfo"]["bloodType"], "A+");
        assert_eq!(back["dueDate"], "2025-10-08");
    }

    #[test]
    fn data_bags_are_filled_without_overwriting() {
        let mut stats: UserStats = serde_json::from_str(r#"{"visitorStatus":"open"}"#).unwrap();
        stats.ensure_data_bags();
        assert_eq!(stats.extra["visitorStatus"], "open");
        assert_eq!(stats.extra["budgetPlan"]["totalBudget"], 50000);
    }

    #[test]
    fn active_daily_skips_addressed_missions() {
        let cat = Catalog::builtin();
        let mut stats = UserStats::default();
        assert_eq!(stats.active_daily(&cat, &tl(0)).len(), 2);
        stats.completed_daily_mission_ids.push("daily_0_0".into());
        let active = stats.active_daily(&cat, &tl(0));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "daily_0_1");
    }

    #[test]
    fn custom_visibility_follows_schedule() {
        let mut stats = UserStats::default();
        let mut restored_overdue = custom("r", Some("2024-12-30"));
        restored_overdue.restored_count = 1;
        stats.custom_missions = vec![
            custom("none", None),
            custom("today", Some("2025-01-03")),
            custom("past", Some("2024-12-30")),
            custom("future", Some("2025-02-01")),
            restored_overdue,
        ];
        let ids: Vec<&str> = stats.active_custom(&tl(2)).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["none", "today", "past"]);
        let upcoming: Vec<&str> = stats.upcoming(&tl(2)).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(upcoming, vec!["future"]);
    }

    #[test]
    fn locate_reports_collection() {
        let cat = Catalog::builtin();
        let mut stats = UserStats::default();
        stats.postponed_missions.push(custom("p", None));
        assert_eq!(stats.locate("p", &cat, &tl(0)).map(|(c, _)| c), Some(Collection::Postponed));
        assert_eq!(stats.locate("daily_0_1", &cat, &tl(0)).map(|(c, _)| c), Some(Collection::ActiveDaily));
        assert!(stats.locate("daily_5_0", &cat, &tl(0)).is_none());
    }
}
