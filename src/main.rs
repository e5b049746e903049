//! # ops - partner mission log
//!
//! Command-line front end for the `partner_ops` engine: daily missions on the
//! pregnancy timeline, XP and ranks, a backlog for postponed work and a
//! history of what got done or missed.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register with the due date
//! ops --user tata@example.cz init --due 2025-10-08 --partner Velitelka
//!
//! # What's on today
//! ops today
//!
//! # Finish, postpone or give up on a mission (ID or title)
//! ops complete daily_120_0
//! ops postpone "Kurýrní služba"
//!
//! # Look back
//! ops history --summary
//!
//! # Time travel
//! ops --day 200 status
//! ```
//!
//! Data is stored locally in `~/.partner-ops/` with one JSON file per user.
//! Set `OPS_API_URL` (or `--api`) to mirror every change to the stats server.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod cmd;

use cli::Cli;
use cmd::*;
use partner_ops::config::{Config, Overrides};
use partner_ops::{OpsError, Result};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env(Overrides {
        data_dir: cli.data_dir.clone(),
        user: cli.user.clone(),
        api_url: cli.api.clone(),
    });

    if let Err(e) = dispatch(cli, &config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli, config: &Config) -> Result<()> {
    // Commands that don't need a user first
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return Ok(());
        }
        Commands::Users => return cmd_users(config),
        _ => {}
    }

    let email = config
        .user
        .clone()
        .ok_or_else(|| OpsError::Input("no user selected; pass --user <email> or set OPS_USER".into()))?;

    match &cli.command {
        Commands::Init { due, partner, name } => {
            return cmd_init(config, &email, cli.day, due.clone(), partner.clone(), name.clone());
        }
        Commands::Pull => return cmd_pull(config, &email),
        Commands::Purge { remote } => return cmd_purge(config, &email, *remote),
        _ => {}
    }

    let mut session = Session::open(config, &email, cli.day)?;
    if !session.store.exists(&email) {
        return Err(OpsError::Input(format!("no data for {}; run `ops init --due <date>` first", email)));
    }
    let missed = session.catch_up()?;
    report(&missed);

    match cli.command {
        Commands::Init { .. } | Commands::Pull | Commands::Purge { .. } => unreachable!("handled above"),
        Commands::Completions { .. } | Commands::Users => unreachable!("handled above"),

        Commands::Status => cmd_status(&session),
        Commands::Today => cmd_today(&session),
        Commands::Backlog => cmd_backlog(&session),
        Commands::Upcoming => cmd_upcoming(&session),
        Commands::History { missed, category, week, month, summary } =>
            cmd_history(&session, missed, category, week, month, summary),

        Commands::Complete { id } => cmd_complete(&mut session, id)?,
        Commands::Fail { id } => cmd_fail(&mut session, id)?,
        Commands::Postpone { id } => cmd_postpone(&mut session, id)?,
        Commands::Schedule { id, date } => cmd_schedule(&mut session, id, date)?,
        Commands::Restore { id, date } => cmd_restore(&mut session, id, date)?,
        Commands::Add { title, desc, date } => cmd_add(&mut session, title, desc, date)?,
        Commands::Delete { id } => cmd_delete(&mut session, id)?,

        Commands::Push => cmd_push(&session, config)?,
    }
    Ok(())
}
