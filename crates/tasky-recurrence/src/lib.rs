//! # tasky-recurrence
//!
//! Recurring task support:
//!
//! - [`calculator`]: pure next-occurrence arithmetic for daily, weekly,
//!   monthly and yearly rules
//! - [`describe`]: human-readable rule summaries in English and Russian
//! - [`instantiator`]: creates the next task of a series once the current
//!   one is past due
//!
//! ## Crate Position
//!
//! Depends on `tasky-core`. Used by the binary and by any task-listing caller.

#![deny(unsafe_code)]

pub mod calculator;
pub mod describe;
pub mod instantiator;

pub use calculator::{compute_next_occurrence, compute_next_occurrence_in};
pub use describe::describe_rule;
pub use instantiator::{ProcessReport, RecurringTaskInstantiator};
