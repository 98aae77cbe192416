//! # tasky-store
//!
//! `SQLite` persistence for users, tasks, projects, tags, scheduling settings
//! and backups.
//!
//! - [`connection`]: r2d2 pool with per-connection pragmas
//! - [`migrations`]: embedded, versioned schema migrations
//! - [`repositories`]: stateless repositories over a `&Connection`
//! - [`SqliteStore`]: async implementation of the scheduler's
//!   [`ScheduleStore`](tasky_core::traits::ScheduleStore) and
//!   [`TaskCreator`](tasky_core::traits::TaskCreator) traits
//!
//! ## Crate Position
//!
//! Depends on `tasky-core`. Used by the `tasky` binary.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod store;
pub mod types;

pub use connection::ConnectionConfig;
pub use errors::{Result, StoreError};
pub use store::SqliteStore;
