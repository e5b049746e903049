use std::path::PathBuf;

use clap::Parser;

use partner_ops::timeline::MAX_DAY_INDEX;

use crate::cmd::Commands;

/// Mission log for the expecting partner.
/// Storage defaults to ~/.partner-ops or a directory passed via --data-dir.
#[derive(Parser)]
#[command(name = "ops", version, about = "Daily missions, XP and ranks on the pregnancy timeline")]
pub struct Cli {
    /// Directory holding the per-user JSON files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// User email the data is keyed by.
    #[arg(long, short, global = true)]
    pub user: Option<String>,

    /// Override the timeline day index (time travel).
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_DAY_INDEX)))]
    pub day: Option<u32>,

    /// API root for remote sync, e.g. http://localhost:3000/api.
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Verbose logging (repeat for more).
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_override_is_range_checked() {
        let cli = Cli::try_parse_from(["ops", "--day", "120", "status"]).unwrap();
        assert_eq!(cli.day, Some(120));
        assert!(Cli::try_parse_from(["ops", "--day", "4294967295", "status"]).is_err());
        assert!(Cli::try_parse_from(["ops", "status", "--day", "401"]).is_err());
    }
}
