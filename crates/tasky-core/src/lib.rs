//! # tasky-core
//!
//! Foundation types and utilities for the tasky scheduler.
//!
//! This crate provides the shared vocabulary that all other tasky crates depend on:
//!
//! - **IDs**: [`ids::UserId`] newtype over the Telegram user id
//! - **Tasks**: [`task::Task`], [`task::TaskPayload`], [`task::RecurrenceRule`]
//! - **Settings**: [`settings::UserScheduleSettings`] with per-user defaults
//! - **Notifications**: [`notification::NotificationClass`]
//! - **Time**: [`time::resolve_user_time`] and local-midnight helpers
//! - **Quiet hours**: [`quiet_hours::is_suppressed`]
//! - **Collaborators**: [`traits::ScheduleStore`], [`traits::TaskCreator`], [`traits::Notifier`]
//! - **Errors**: [`errors::CoreError`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other tasky crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod notification;
pub mod quiet_hours;
pub mod settings;
pub mod task;
pub mod time;
pub mod traits;

pub use errors::{CoreError, Result};
pub use ids::UserId;
