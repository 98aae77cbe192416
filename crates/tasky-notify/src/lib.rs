//! # tasky-notify
//!
//! Delivers scheduler messages through the Telegram Bot API.
//!
//! [`TelegramNotifier`] implements [`tasky_core::traits::Notifier`]. Delivery
//! failures never surface as errors: they come back as a failed
//! [`SendResult`](tasky_core::traits::SendResult) and a warn log.
//!
//! ## Crate Position
//!
//! Depends on `tasky-core` and `tasky-settings`. Used by the `tasky` binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod telegram;

pub use errors::NotifyError;
pub use telegram::TelegramNotifier;
