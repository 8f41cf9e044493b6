//! Domain types for Remindr
//!
//! This module contains all core domain types:
//! - Task: external task snapshot with repeat rule and time logs
//! - AlertStage / AlertKey: typed keying for the scheduler's timer table
//! - ReminderEvent: the payload handed to notification sinks

pub mod alert;
pub mod event;
pub mod task;

pub use alert::{AlertKey, AlertStage};
pub use event::ReminderEvent;
pub use task::{Priority, Repeat, RepeatDay, Task, TaskId, TimeLogEntry};
