//! # tasky-cron
//!
//! Time-driven side of tasky: a per-minute tick that sends daily summaries,
//! reminders and overdue lists in each user's local time, plus daily
//! housekeeping (backups, retention, auto-archive) on fixed UTC slots.
//!
//! - [`engine::SchedulingEngine`]: the tick and the run loop
//! - [`dedup::NotificationDedupTracker`]: at most one fire per user, class and local day
//! - [`clock`]: wall clock for production, manual clock for tests
//! - [`messages`]: localized HTML message bodies
//! - [`housekeeping::HousekeepingSchedule`]: once-per-UTC-day job slots
//!
//! ## Crate Position
//!
//! Depends on `tasky-core`. Used by the `tasky` binary.

#![deny(unsafe_code)]

pub mod clock;
pub mod dedup;
pub mod engine;
pub mod housekeeping;
pub mod messages;

pub use clock::{Clock, ManualClock, ManualClockHandle, WallClock};
pub use dedup::NotificationDedupTracker;
pub use engine::{SchedulingEngine, TickReport};
pub use housekeeping::{HousekeepingJob, HousekeepingSchedule};
