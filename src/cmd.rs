//! Command handlers for the `ops` binary.
//!
//! Every mutating handler goes through [`Session::run`], which applies one
//! engine command, saves the aggregate and pushes it to the remote when one
//! is configured. Read-only handlers only print.

use chrono::{NaiveDate, SecondsFormat, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use tracing::{debug, info};

use partner_ops::catalog::Catalog;
use partner_ops::config::{Config, ConfigFile};
use partner_ops::deserter::is_deserter;
use partner_ops::engine::{apply, Command, Context, Event, CUSTOM_MISSION_POINTS};
use partner_ops::fields::{format_category, ArchiveMode, Category, Priority};
use partner_ops::history::{available_buckets, available_categories, summarize, week_and_month, HistoryFilter};
use partner_ops::rank::RANKS;
use partner_ops::stats::{Collection, UserStats};
use partner_ops::store::Store;
use partner_ops::sync::{push_best_effort, HttpRemote, Remote};
use partner_ops::task::Task;
use partner_ops::timeline::{format_relative, now_time, parse_date_input, today, Timeline};
use partner_ops::{OpsError, Result};

#[derive(Subcommand)]
pub enum Commands {
    /// Register the user (or update the profile) with the due date.
    Init {
        /// Due date: YYYY-MM-DD, "today", "in Nw", ...
        #[arg(long)]
        due: String,
        /// How the missions address the partner.
        #[arg(long)]
        partner: Option<String>,
        /// Display name of the user.
        #[arg(long)]
        name: Option<String>,
    },

    /// Rank, XP, streak and where we are on the timeline.
    Status,

    /// Missions waiting today.
    Today,

    /// Postponed missions.
    Backlog,

    /// Custom missions scheduled for later days.
    Upcoming,

    /// Completed or missed missions.
    History {
        /// Show missed missions instead of completed ones.
        #[arg(long)]
        missed: bool,
        /// Filter by category.
        #[arg(long, value_enum)]
        category: Option<Category>,
        /// Timeline week (1-based).
        #[arg(long)]
        week: Option<u32>,
        /// Timeline month (four weeks each).
        #[arg(long)]
        month: Option<u32>,
        /// Print counts and XP instead of the list.
        #[arg(long)]
        summary: bool,
    },

    /// Complete a mission by ID or title.
    Complete { id: String },

    /// Give up on a mission.
    Fail { id: String },

    /// Move a mission to the backlog.
    Postpone { id: String },

    /// Plan a mission for a given day.
    Schedule {
        id: String,
        /// YYYY-MM-DD, "tomorrow", "in Nd", "friday", ...
        date: String,
    },

    /// Bring back a missed or postponed mission.
    Restore {
        id: String,
        /// Day to do it on. Defaults to today.
        date: Option<String>,
    },

    /// Add a custom order.
    Add {
        title: String,
        #[arg(long)]
        desc: Option<String>,
        /// Schedule for a day instead of today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a custom order.
    Delete { id: String },

    /// Replace the local data with the remote copy.
    Pull,

    /// Upload the local data to the remote.
    Push,

    /// Delete the user's data.
    Purge {
        /// Also delete the remote copy.
        #[arg(long)]
        remote: bool,
    },

    /// List users with local data.
    Users,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// One user's aggregate loaded together with everything needed to act on it.
pub struct Session {
    pub store: Store,
    pub catalog: Catalog,
    pub timeline: Timeline,
    pub stats: UserStats,
    remote: Option<Box<dyn Remote>>,
}

impl Session {
    pub fn open(config: &Config, email: &str, day: Option<u32>) -> Result<Self> {
        let store = Store::new(&config.data_dir);
        let catalog = match &config.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin(),
        };
        let remote: Option<Box<dyn Remote>> = match &config.api_url {
            Some(url) => Some(Box::new(HttpRemote::new(url)?)),
            None => None,
        };
        let stats = store.load(email);
        let timeline = Timeline::resolve(stats.due_date, today(), day).with_time(now_time());
        Ok(Session { store, catalog, timeline, stats, remote })
    }

    fn context(&self) -> Context<'_> {
        Context {
            catalog: &self.catalog,
            timeline: self.timeline,
            now_millis: Utc::now().timestamp_millis(),
        }
    }

    /// Apply a command, persist on success. A rejection leaves everything as is.
    pub fn run(&mut self, command: Command) -> Result<Vec<Event>> {
        let transition = apply(&self.stats, &command, &self.context());
        if let Some(why) = transition.rejection() {
            return Err(why.clone().into());
        }
        self.stats = transition.state;
        self.commit()?;
        Ok(transition.events)
    }

    /// Save locally, then push if a remote is configured.
    pub fn commit(&self) -> Result<()> {
        self.store.save(&self.stats)?;
        if let Some(remote) = &self.remote {
            push_best_effort(remote.as_ref(), &self.stats);
        }
        Ok(())
    }

    /// Materialize missions missed since the last visit.
    pub fn catch_up(&mut self) -> Result<Vec<Event>> {
        if self.stats.due_date.is_none() || self.timeline.day_index <= self.stats.last_processed_day_index {
            return Ok(Vec::new());
        }
        self.run(Command::Sweep { day_index: self.timeline.day_index })
    }

    pub fn is_deserter(&self) -> bool {
        let effective = self.timeline.effective_date.format("%Y-%m-%d").to_string();
        is_deserter(
            &self.stats.mission_history,
            self.stats.account_created.as_deref(),
            &effective,
            today(),
        )
    }

    /// Resolve a mission by id, falling back to a case-insensitive title match.
    pub fn resolve(&self, identifier: &str) -> Result<String> {
        if self.stats.locate(identifier, &self.catalog, &self.timeline).is_some() {
            return Ok(identifier.to_string());
        }

        let wanted = identifier.to_lowercase();
        let mut candidates: Vec<Task> = self.stats.active_missions(&self.catalog, &self.timeline);
        candidates.extend(self.stats.postponed_missions.iter().cloned());
        candidates.extend(self.stats.upcoming(&self.timeline).into_iter().cloned());
        candidates.extend(self.stats.mission_history.iter().filter(|t| t.failed).cloned());
        let matches: Vec<&Task> = candidates.iter().filter(|t| t.title.to_lowercase() == wanted).collect();

        match matches.len() {
            0 => Err(OpsError::Input(format!("No mission found with ID or name '{}'", identifier))),
            1 => Ok(matches[0].id.clone()),
            _ => {
                let mut msg = format!("Multiple missions found with name '{}':\n", identifier);
                for t in matches {
                    msg.push_str(&format!("  {}: {} ({})\n", t.id, t.title, format_category(t.category)));
                }
                msg.push_str("Please use the specific ID instead.");
                Err(OpsError::Input(msg))
            }
        }
    }

    /// Parse a user-entered date relative to the simulated today.
    pub fn parse_date(&self, input: &str) -> Result<NaiveDate> {
        parse_date_input(input, self.timeline.effective_date).ok_or_else(|| {
            OpsError::Input(format!(
                "Invalid date '{}'. Use YYYY-MM-DD, today, tomorrow, in Nd, in Nw, or a weekday.",
                input
            ))
        })
    }
}

/// Print what a transition did.
pub fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::Completed { id, points } => println!("Mission {} complete. +{} XP", id, points),
            Event::RankUp { to, .. } => println!("PROMOTION! New rank: {} {}", to.icon, to.name),
            Event::Postponed { id } => println!("Mission {} moved to the backlog.", id),
            Event::Scheduled { id, date } => println!("Mission {} scheduled for {}.", id, date),
            Event::Restored { id, date } => println!("Mission {} restored for {}.", id, date),
            Event::Failed { id } => println!("Mission {} marked as failed.", id),
            Event::Added { id } => println!("Added custom order {}.", id),
            Event::Deleted { id } => println!("Deleted {}.", id),
            Event::Swept { missed, penalty } => {
                if *missed > 0 {
                    println!("{} mission(s) expired since your last check-in.", missed);
                }
                if *penalty > 0 {
                    println!("Penalty: -{} XP", penalty);
                }
            }
            Event::RestoredMissionFailed(task) => {
                println!("Second chance lost: '{}' was not done in time.", task.title)
            }
            Event::Rejected(why) => println!("Refused: {}", why),
        }
    }
}

/// Register a user or update an existing profile.
pub fn cmd_init(
    config: &Config,
    email: &str,
    day: Option<u32>,
    due: String,
    partner: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let mut session = Session::open(config, email, day)?;
    let due_date = session.parse_date(&due)?;
    let fresh = !session.store.exists(email);

    if fresh {
        let created = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        session.stats = UserStats::new(email, created);
    }
    session.stats.due_date = Some(due_date);
    if let Some(p) = partner.filter(|p| !p.trim().is_empty()) {
        session.stats.partner_name = p.trim().to_string();
    }
    if let Some(n) = name.filter(|n| !n.trim().is_empty()) {
        session.stats.user_name = Some(n.trim().to_string());
    }

    session.timeline = Timeline::resolve(Some(due_date), today(), day).with_time(now_time());
    if fresh {
        // Days before registration are never swept.
        session.stats.last_processed_day_index = session.timeline.day_index;
    }
    session.commit()?;

    let mut file = ConfigFile::load(&config.data_dir);
    if file.default_user.is_none() {
        file.default_user = Some(email.to_string());
        file.save(&config.data_dir)?;
    }

    info!(email, %due_date, fresh, "profile saved");
    if fresh {
        println!("Welcome aboard, {}. Due date {}.", email, due_date);
    } else {
        println!("Profile updated. Due date {}.", due_date);
    }
    println!(
        "Day {} (week {}), {}",
        session.timeline.day_index,
        session.timeline.week(),
        session.timeline.effective_date
    );
    Ok(())
}

pub fn cmd_status(session: &Session) {
    let stats = &session.stats;
    let progress = stats.progression(session.is_deserter());
    let tl = &session.timeline;

    println!("{} ({})", stats.user_name.as_deref().unwrap_or(&stats.email), stats.partner_name);
    if let Some(due) = stats.due_date {
        println!("Day {:<4} week {:<3} {}  (due {})", tl.day_index, tl.week(), tl.effective_date, due);
    } else {
        println!("No due date set. Run `ops init --due <date>`.");
    }
    println!("Rank   {} {} (level {})", progress.displayed.icon, progress.displayed.name, progress.rank.level);
    if progress.is_deserter() {
        println!("       No activity for a week. Complete a mission to get your rank back.");
    }
    match progress.next {
        Some(next) => println!(
            "XP     {} / {}  [{}] {:.0}% to {}",
            stats.points,
            next.min_points,
            progress_bar(progress.percent, 20),
            progress.percent,
            next.name
        ),
        None => println!("XP     {}  [{}] top rank", stats.points, progress_bar(100.0, 20)),
    }
    println!("Streak {} day(s)", stats.streak);
    println!(
        "Open   {} today, {} in backlog, {} upcoming",
        stats.active_missions(&session.catalog, tl).len(),
        stats.postponed_missions.len(),
        stats.upcoming(tl).len()
    );
    if stats.mission_history.is_empty() {
        println!();
        print_ranks();
    }
}

pub fn cmd_today(session: &Session) {
    let tasks = session.stats.active_missions(&session.catalog, &session.timeline);
    if tasks.is_empty() {
        println!("All missions for today are done.");
        return;
    }
    let refs: Vec<&Task> = tasks.iter().collect();
    print_table(&refs, session.timeline.effective_date);
}

pub fn cmd_backlog(session: &Session) {
    let refs: Vec<&Task> = session.stats.postponed_missions.iter().collect();
    if refs.is_empty() {
        println!("Backlog is empty.");
        return;
    }
    print_table(&refs, session.timeline.effective_date);
}

pub fn cmd_upcoming(session: &Session) {
    let refs = session.stats.upcoming(&session.timeline);
    if refs.is_empty() {
        println!("Nothing scheduled.");
        return;
    }
    print_table(&refs, session.timeline.effective_date);
}

pub fn cmd_history(
    session: &Session,
    missed: bool,
    category: Option<Category>,
    week: Option<u32>,
    month: Option<u32>,
    summary: bool,
) {
    let history = &session.stats.mission_history;
    let tl = &session.timeline;
    let filter = HistoryFilter {
        mode: if missed { ArchiveMode::Missed } else { ArchiveMode::Completed },
        category,
        week,
        month,
    };
    let rows = filter.apply(history, tl);

    if summary {
        let s = summarize(rows.iter().copied(), tl.effective_date);
        println!("{:<12} {:>6} {:>7}", "Period", "Count", "XP");
        println!("{:<12} {:>6} {:>7}", "Last 7 days", s.this_week.count, s.this_week.xp);
        println!("{:<12} {:>6} {:>7}", "This month", s.this_month.count, s.this_month.xp);
        println!("{:<12} {:>6} {:>7}", "Total", s.total.count, s.total.xp);
        let (weeks, months) = available_buckets(history, tl);
        println!("Weeks:  {}", join_numbers(&weeks));
        println!("Months: {}", join_numbers(&months));
        let cats: Vec<&str> = available_categories(history).into_iter().map(format_category).collect();
        println!("Categories: {}", cats.join(", "));
        return;
    }

    if rows.is_empty() {
        println!("No missions match.");
        return;
    }
    println!("{:<20} {:<6} {:<10} {:<5} {:<15} {}", "ID", "Week", "Date", "XP", "Category", "Title");
    for t in rows {
        let (w, _) = week_and_month(t, tl);
        let date = t.completed_date.as_deref().map(|d| d.chars().take(10).collect::<String>());
        let mut title = truncate(&t.title, 40);
        if t.failed && t.manual_fail {
            title.push_str(" (gave up)");
        } else if t.failed && t.can_restore() {
            title.push_str(" (restorable)");
        }
        println!(
            "{:<20} {:<6} {:<10} {:<5} {:<15} {}",
            truncate(&t.id, 20),
            w,
            date.unwrap_or_else(|| "-".into()),
            t.points,
            format_category(t.category),
            title
        );
    }
}

pub fn cmd_complete(session: &mut Session, id: String) -> Result<()> {
    let id = session.resolve(&id)?;
    let events = session.run(Command::Complete { id })?;
    report(&events);
    Ok(())
}

pub fn cmd_fail(session: &mut Session, id: String) -> Result<()> {
    let id = session.resolve(&id)?;
    let events = session.run(Command::Fail { id })?;
    report(&events);
    Ok(())
}

pub fn cmd_postpone(session: &mut Session, id: String) -> Result<()> {
    let id = session.resolve(&id)?;
    let events = session.run(Command::Postpone { id })?;
    report(&events);
    Ok(())
}

pub fn cmd_schedule(session: &mut Session, id: String, date: String) -> Result<()> {
    let id = session.resolve(&id)?;
    let date = session.parse_date(&date)?;
    let events = session.run(Command::Schedule { id, date })?;
    report(&events);
    Ok(())
}

pub fn cmd_restore(session: &mut Session, id: String, date: Option<String>) -> Result<()> {
    let id = session.resolve(&id)?;
    let date = match date {
        Some(d) => session.parse_date(&d)?,
        None => session.timeline.effective_date,
    };
    if let Some((Collection::History, task)) = session.stats.locate(&id, &session.catalog, &session.timeline) {
        if task.failed && task.can_restore() {
            println!("Last chance: if '{}' fails again it is gone for good.", task.title);
        }
    }
    let events = session.run(Command::Restore { id, date })?;
    report(&events);
    Ok(())
}

pub fn cmd_add(session: &mut Session, title: String, desc: Option<String>, date: Option<String>) -> Result<()> {
    let scheduled_date = match date {
        Some(d) => Some(session.parse_date(&d)?),
        None => None,
    };
    let events = session.run(Command::AddCustom {
        title,
        description: desc.unwrap_or_default(),
        scheduled_date,
    })?;
    report(&events);
    println!("Worth {} XP.", CUSTOM_MISSION_POINTS);
    Ok(())
}

pub fn cmd_delete(session: &mut Session, id: String) -> Result<()> {
    let id = session.resolve(&id)?;
    let events = session.run(Command::Delete { id })?;
    report(&events);
    Ok(())
}

/// Replace local data with the remote copy.
pub fn cmd_pull(config: &Config, email: &str) -> Result<()> {
    let remote = remote_for(config)?;
    match remote.pull(email)? {
        Some(mut stats) => {
            stats.email = email.to_string();
            stats.ensure_data_bags();
            Store::new(&config.data_dir).save(&stats)?;
            println!("Pulled {} XP and {} history entries.", stats.points, stats.mission_history.len());
        }
        None => println!("Remote has no data for {}.", email),
    }
    Ok(())
}

pub fn cmd_push(session: &Session, config: &Config) -> Result<()> {
    let remote = remote_for(config)?;
    remote.push(&session.stats)?;
    println!("Pushed.");
    Ok(())
}

pub fn cmd_purge(config: &Config, email: &str, remote: bool) -> Result<()> {
    let removed = Store::new(&config.data_dir).remove(email)?;
    if removed {
        println!("Deleted local data for {}.", email);
    } else {
        println!("No local data for {}.", email);
    }
    if remote {
        remote_for(config)?.purge(email)?;
        println!("Deleted remote data for {}.", email);
    }
    Ok(())
}

pub fn cmd_users(config: &Config) -> Result<()> {
    let users = Store::new(&config.data_dir).users()?;
    if users.is_empty() {
        println!("No users in {}.", config.data_dir.display());
        return Ok(());
    }
    for key in users {
        let mark = if config.user.as_deref().map(partner_ops::store::storage_key).as_deref() == Some(key.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", mark, key);
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

fn remote_for(config: &Config) -> Result<HttpRemote> {
    let url = config
        .api_url
        .as_deref()
        .ok_or_else(|| OpsError::Input("no API url configured; pass --api or set OPS_API_URL".into()))?;
    debug!(url, "using remote");
    HttpRemote::new(url)
}

fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!("{:<20} {:<5} {:<15} {:<10} {}", "ID", "XP", "Category", "When", "Title");
    for t in tasks {
        let flag = if t.priority == Priority::Highest { "!" } else { "" };
        let restored = if t.restored_count > 0 { " (2nd chance)" } else { "" };
        println!(
            "{:<20} {:<5} {:<15} {:<10} {}{}{}",
            truncate(&t.id, 20),
            t.points,
            format_category(t.category),
            format_relative(t.scheduled_date, today),
            flag,
            truncate(&t.title, 48),
            restored
        );
    }
}

fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round().clamp(0.0, width as f64) as usize;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

fn join_numbers(values: &[u32]) -> String {
    if values.is_empty() {
        return "-".into();
    }
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

/// Truncate to `width` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// The rank ladder, shown until the first mission is logged.
pub fn print_ranks() {
    for r in RANKS {
        println!("{:>3} {} {:<24} {:>6} XP", r.level, r.icon, r.name, r.min_points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(dir: &Path) -> Config {
        Config { data_dir: dir.to_path_buf(), user: None, api_url: None, catalog: None }
    }

    fn registered(dir: &Path, day: u32) -> Session {
        let cfg = config(dir);
        let mut s = Session::open(&cfg, "t@x.cz", Some(day)).unwrap();
        s.stats = UserStats::new("t@x.cz", "2025-01-01T00:00:00.000Z".into());
        s.stats.due_date = Some(NaiveDate::from_ymd_opt(2025, 10, 8).unwrap());
        s.timeline = Timeline::resolve(s.stats.due_date, today(), Some(day));
        s
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("čáp", 3), "čáp");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "----");
        assert_eq!(progress_bar(50.0, 4), "##--");
        assert_eq!(progress_bar(100.0, 4), "####");
    }

    #[test]
    fn run_persists_and_rejections_do_not() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = registered(dir.path(), 0);
        s.run(Command::Complete { id: "daily_0_0".into() }).unwrap();
        let saved = s.store.load("t@x.cz");
        assert_eq!(saved.points, s.stats.points);
        assert!(saved.points > 0);

        let err = s.run(Command::Delete { id: "daily_0_1".into() }).unwrap_err();
        assert!(matches!(err, OpsError::Rejected(_)));
        assert_eq!(s.store.load("t@x.cz"), saved);
    }

    #[test]
    fn resolves_by_id_or_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = registered(dir.path(), 0);
        s.run(Command::AddCustom { title: "Koupit kočárek".into(), description: String::new(), scheduled_date: None })
            .unwrap();
        let id = s.stats.custom_missions[0].id.clone();
        assert_eq!(s.resolve(&id).unwrap(), id);
        assert_eq!(s.resolve("koupit KOČÁREK").unwrap(), id);
        assert!(matches!(s.resolve("nothing"), Err(OpsError::Input(_))));
    }

    #[test]
    fn catch_up_sweeps_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = registered(dir.path(), 3);
        let events = s.catch_up().unwrap();
        assert!(matches!(events.first(), Some(Event::Swept { missed, .. }) if *missed > 0));
        assert_eq!(s.stats.last_processed_day_index, 3);
        assert!(s.catch_up().unwrap().is_empty());
    }

    #[test]
    fn parse_date_is_relative_to_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let s = registered(dir.path(), 10);
        let tomorrow = s.parse_date("tomorrow").unwrap();
        assert_eq!(tomorrow, s.timeline.effective_date.succ_opt().unwrap());
        assert!(s.parse_date("someday").is_err());
    }
}
