//! Enumerations and field types for missions.
//!
//! The wire names match the JSON the web client has always written, so stored
//! aggregates load without migration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Closed set of mission tags. Used for grouping and filtering only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "perimetr")]
    Perimeter,
    #[serde(rename = "údržba")]
    Maintenance,
    #[serde(rename = "trezor")]
    Vault,
    #[serde(rename = "zásoby")]
    Supplies,
    #[serde(rename = "strategie")]
    Strategy,
    #[serde(rename = "průzkum")]
    Recon,
    #[serde(rename = "medik")]
    Medic,
    #[serde(rename = "servis")]
    Service,
    #[serde(rename = "briefing")]
    Briefing,
    #[serde(rename = "stavba")]
    Construction,
    #[serde(rename = "logistika")]
    Logistics,
    #[serde(rename = "transport")]
    Transport,
    #[serde(rename = "junior_update")]
    JuniorUpdate,
    #[serde(rename = "velká_mise")]
    MajorMission,
    #[serde(rename = "hardware")]
    Hardware,
    /// User-created orders. The only category that may be deleted.
    #[serde(rename = "vlastní_rozkaz")]
    CustomOrder,
}

impl Category {
    pub fn is_custom(self) -> bool {
        self == Category::CustomOrder
    }
}

/// Cosmetic urgency flag.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Highest,
}

/// Which side of the history log a listing shows.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum ArchiveMode {
    #[default]
    Completed,
    Missed,
}

/// Format a category for display.
pub fn format_category(c: Category) -> &'static str {
    match c {
        Category::Perimeter => "perimetr",
        Category::Maintenance => "údržba",
        Category::Vault => "trezor",
        Category::Supplies => "zásoby",
        Category::Strategy => "strategie",
        Category::Recon => "průzkum",
        Category::Medic => "medik",
        Category::Service => "servis",
        Category::Briefing => "briefing",
        Category::Construction => "stavba",
        Category::Logistics => "logistika",
        Category::Transport => "transport",
        Category::JuniorUpdate => "junior_update",
        Category::MajorMission => "velká_mise",
        Category::Hardware => "hardware",
        Category::CustomOrder => "vlastní_rozkaz",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_uses_client_wire_names() {
        assert_eq!(serde_json::to_string(&Category::CustomOrder).unwrap(), "\"vlastní_rozkaz\"");
        let c: Category = serde_json::from_str("\"údržba\"").unwrap();
        assert_eq!(c, Category::Maintenance);
        assert_eq!(format_category(c), "údržba");
    }

    #[test]
    fn only_custom_orders_are_custom() {
        assert!(Category::CustomOrder.is_custom());
        assert!(!Category::Medic.is_custom());
    }
}
