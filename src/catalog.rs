//! Daily mission catalogue.
//!
//! Maps a day index on the timeline to the system-generated missions for that
//! day. Generated missions get stable ids (`daily_<day>_<n>`) so that the same
//! day always produces the same tasks.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::fields::Category;
use crate::task::Task;

/// Day table shipped with the binary, same format as [`Catalog::load`] reads.
const BUILTIN_DAYS: &str = include_str!("../data/daily_missions.json");

/// First day index served from the overdue rotation.
pub const OVERDUE_FROM_DAY: u32 = 295;

/// Shape of a catalogue entry before it is bound to a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub points: u32,
}

impl MissionTemplate {
    fn new(title: &str, description: &str, category: Category, points: u32) -> Self {
        MissionTemplate {
            title: title.to_string(),
            description: description.to_string(),
            category,
            points,
        }
    }

    fn bind(&self, day: u32, index: usize) -> Task {
        let mut task = Task::new(format!("daily_{}_{}", day, index), &self.title, self.points, self.category);
        task.description = self.description.clone();
        task.is_daily = true;
        task
    }
}

/// Day table plus the generic and overdue rotations.
#[derive(Debug, Clone)]
pub struct Catalog {
    days: BTreeMap<u32, Vec<MissionTemplate>>,
    generic: Vec<MissionTemplate>,
    overdue: Vec<MissionTemplate>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::builtin()
    }
}

impl Catalog {
    /// The catalogue shipped with the binary.
    pub fn builtin() -> Self {
        use Category::*;
        let days = serde_json::from_str(BUILTIN_DAYS).unwrap_or_else(|e| {
            warn!(error = %e, "built-in mission table is unreadable, using generic missions only");
            BTreeMap::new()
        });

        let generic = vec![
            MissionTemplate::new("Kontrola hydratace Velitelky", "Zajisti, aby Velitelka měla vždy po ruce vodu. Hydratace je klíčová pro tvorbu plodové vody.", Service, 10),
            MissionTemplate::new("Masáž šíje", "Nabídni krátkou masáž ramen a šíje pro uvolnění napětí.", Medic, 15),
            MissionTemplate::new("Doplnění vitamínů", "Připomeň nebo připrav vitamíny pro těhotné.", Supplies, 10),
            MissionTemplate::new("Večerní procházka", "Navrhni krátkou procházku na čerstvém vzduchu.", Recon, 35),
            MissionTemplate::new("Úklid sektoru kuchyně", "Převezmi iniciativu a ukliď kuchyň/nádobí.", Maintenance, 40),
            MissionTemplate::new("Záznam do deníku", "Zapiš, jak se dnes Velitelka cítila a zda byl zaznamenán pohyb.", Briefing, 15),
            MissionTemplate::new("Kontrola zásob", "Ověř stav lednice a spíže. Nedochází něco důležitého?", Supplies, 15),
        ];

        let overdue = vec![
            MissionTemplate::new("Logistika komfortu", "Přines do nemocnice cokoli, co zlepší prostředí – vlastní polštář, oblíbené pití nebo knížku. Nemocniční setup je strohý.", Logistics, 45),
            MissionTemplate::new("Emocionální kotva", "Buď k dispozici pro ventilaci frustrace. Přenášení v nemocnici je psychicky náročné. Jen poslouchej a buď tam.", Medic, 40),
            MissionTemplate::new("Psychická bariéra", "Filtruj dotazy rodiny a okolí. Ty jsi ten, kdo podává hlášení. Mamině dopřej komunikační klid na odpočinek.", Briefing, 45),
            MissionTemplate::new("Zabezpečení základny", "Ujisti se, že doma je vše v režimu 'Ready'. Čisté povlečení, vysypané koše, lednice připravená na návrat.", Maintenance, 40),
            MissionTemplate::new("Kurýrní služba", "Ověř, zda nechybí něco z výbavy nebo hygieny. Cokoli zapomenuté musíš doručit v prioritním režimu.", Transport, 45),
            MissionTemplate::new("Morální podpora systému", "Přenášení je vyčerpávající. Oceň její sílu a trpělivost. Jsi v tom s ní až do finálního vítězství.", Medic, 40),
        ];

        Catalog { days, generic, overdue }
    }

    /// Built-in rotations with the day table replaced by a JSON file of the
    /// form `{ "<day>": [ {title, description, category, points}, ... ] }`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let days: BTreeMap<u32, Vec<MissionTemplate>> = serde_json::from_str(&raw)?;
        Ok(Catalog { days, ..Catalog::builtin() })
    }

    /// Missions generated for a day index.
    pub fn missions_for_day(&self, day: u32) -> Vec<Task> {
        let picked: Vec<&MissionTemplate> = if day >= OVERDUE_FROM_DAY && !self.overdue.is_empty() {
            let i = (day - OVERDUE_FROM_DAY) as usize % self.overdue.len();
            vec![&self.overdue[i]]
        } else {
            match self.days.get(&day) {
                Some(list) if !list.is_empty() => list.iter().collect(),
                _ => self.generic_for(day),
            }
        };
        picked
            .into_iter()
            .enumerate()
            .map(|(i, tmpl)| tmpl.bind(day, i))
            .collect()
    }

    fn generic_for(&self, day: u32) -> Vec<&MissionTemplate> {
        if self.generic.is_empty() {
            return Vec::new();
        }
        let len = self.generic.len();
        let day = day as usize;
        vec![&self.generic[day % len], &self.generic[(day + 3) % len]]
    }
}
