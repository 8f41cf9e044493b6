//! Remindr - a recurring reminder scheduling engine
//!
//! Remindr computes next occurrences for daily and weekly repeating
//! tasks, fans fired reminders out through priority-tiered alerts, and
//! derives habit streaks and goal percentages from time logs. Task
//! storage and notification delivery stay outside, behind the
//! `TaskSource` and `NotificationSink` seams.

pub mod analytics;
pub mod clock;
pub mod domain;
pub mod error;
pub mod recurrence;
pub mod scheduler;
pub mod source;

pub use error::{RemindrError, Result};
