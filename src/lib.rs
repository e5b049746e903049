//! # partner_ops
//!
//! Mission & progression engine behind a gamified pregnancy companion.
//!
//! The partner gets a couple of daily "missions" for each day of the
//! pregnancy timeline, earns XP for completing them and climbs a fixed rank
//! ladder. Missions can be postponed to a backlog, scheduled for a later day,
//! restored once after failing, or left to expire. A week without any activity
//! flags the user as a deserter until they come back.
//!
//! ## Layout
//!
//! - [`engine`]: pure `(state, command) -> (state, events)` transitions
//! - [`deserter`], [`rank`]: pure queries over the aggregate
//! - [`stats`]: the `UserStats` aggregate and its collections
//! - [`history`]: filters and summaries over the history log
//! - [`store`], [`sync`]: local JSON files and best-effort remote sync
//!
//! ```no_run
//! use partner_ops::{catalog::Catalog, engine::{apply, Command, Context}};
//! use partner_ops::{stats::UserStats, timeline::{today, Timeline}};
//!
//! let catalog = Catalog::builtin();
//! let ctx = Context { catalog: &catalog, timeline: Timeline::at(today(), 0), now_millis: 0 };
//! let next = apply(&UserStats::default(), &Command::Complete { id: "daily_0_0".into() }, &ctx);
//! assert_eq!(next.state.points, 45);
//! ```

pub mod catalog;
pub mod config;
pub mod deserter;
pub mod engine;
pub mod error;
pub mod fields;
pub mod history;
pub mod rank;
pub mod stats;
pub mod store;
pub mod sync;
pub mod task;
pub mod timeline;

pub use error::{OpsError, Result};
