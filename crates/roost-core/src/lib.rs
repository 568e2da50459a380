//! # roost-core
//!
//! Core types for Roost, a household chore rotation bot.
//!
//! ## Model
//!
//! - People take turns on recurring tasks; one of them is the backup who gets
//!   escalations and runs the system by text command
//! - A task occurrence assigned to a person on a date is an [`Assignment`]
//! - Each person carries a conversational [`Context`] that decides how their next
//!   reply is read
//! - Away days make a person unavailable for all or half of a date

pub mod away;
pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use away::{AwayDay, HalfDay};
pub use config::RoostConfig;
pub use error::{Result, RoostError};
pub use types::*;
