//! Task model consumed by the scheduler
//!
//! Tasks are owned by an external store; this crate only reads them. The
//! scheduler receives full snapshots and treats every snapshot as
//! authoritative.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opaque task identifier assigned by the external store
pub type TaskId = String;

/// Notification priority tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl Priority {
    /// High priority tasks get an early-warning alert ahead of the main one
    pub fn has_pre_alert(&self) -> bool {
        matches!(self, Priority::High)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// Day of week for weekly repeat rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl RepeatDay {
    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => RepeatDay::Mon,
            Weekday::Tue => RepeatDay::Tue,
            Weekday::Wed => RepeatDay::Wed,
            Weekday::Thu => RepeatDay::Thu,
            Weekday::Fri => RepeatDay::Fri,
            Weekday::Sat => RepeatDay::Sat,
            Weekday::Sun => RepeatDay::Sun,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatDay::Mon => "Mon",
            RepeatDay::Tue => "Tue",
            RepeatDay::Wed => "Wed",
            RepeatDay::Thu => "Thu",
            RepeatDay::Fri => "Fri",
            RepeatDay::Sat => "Sat",
            RepeatDay::Sun => "Sun",
        }
    }
}

impl fmt::Display for RepeatDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repeat rule for a task's reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Repeat {
    /// One-shot reminder; never refires after its time passes
    None,
    /// Fires every day at the reminder time
    Daily,
    /// Fires on the listed weekdays at the reminder time
    Weekly { days: BTreeSet<RepeatDay> },
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::None
    }
}

impl Repeat {
    /// Build a weekly rule from any iterator of days (duplicates collapse)
    pub fn weekly<I: IntoIterator<Item = RepeatDay>>(days: I) -> Self {
        Repeat::Weekly {
            days: days.into_iter().collect(),
        }
    }

    /// Returns true if firing is not a terminal state for this rule
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Repeat::None)
    }
}

/// One day's logged minutes; the store guarantees at most one entry per
/// calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub date: NaiveDate,
    pub minutes: u32,
    #[serde(default)]
    pub summary: String,
}

impl TimeLogEntry {
    pub fn new(date: NaiveDate, minutes: u32, summary: &str) -> Self {
        Self {
            date,
            minutes,
            summary: summary.to_string(),
        }
    }
}

/// A task snapshot as supplied by the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_habit: bool,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub reminder_time: Option<NaiveTime>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default)]
    pub time_goal_minutes: Option<u32>,
    #[serde(default)]
    pub time_spent: Vec<TimeLogEntry>,
    #[serde(default)]
    pub postponed_until: Option<NaiveDate>,
    #[serde(default)]
    pub missed_for_date: HashMap<NaiveDate, String>,
}

impl Task {
    /// New task with the given id and title; everything else defaulted
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            priority: Priority::default(),
            completed: false,
            is_habit: false,
            deadline: None,
            reminder_time: None,
            repeat: Repeat::None,
            time_goal_minutes: None,
            time_spent: Vec::new(),
            postponed_until: None,
            missed_for_date: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_reminder(mut self, time: NaiveTime) -> Self {
        self.reminder_time = Some(time);
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Mark as a habit with a daily time goal in minutes
    pub fn with_habit(mut self, goal_minutes: u32) -> Self {
        self.is_habit = true;
        self.time_goal_minutes = Some(goal_minutes);
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_postponed(mut self, until: NaiveDate) -> Self {
        self.postponed_until = Some(until);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Kind label used in notification copy
    pub fn kind_label(&self) -> &'static str {
        if self.is_habit { "Habit" } else { "Task" }
    }

    /// True while the postponement date is strictly after `today`
    pub fn is_postponed_beyond(&self, today: NaiveDate) -> bool {
        matches!(self.postponed_until, Some(until) if until > today)
    }
}
