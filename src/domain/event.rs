//! Notification events emitted when an alert fires

use super::alert::AlertStage;
use super::task::{Priority, Task, TaskId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Event delivered to the notification sink when an alert fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub task_id: TaskId,
    pub stage: AlertStage,
    pub title: String,
    pub message: String,
    pub fired_at: NaiveDateTime,
}

impl ReminderEvent {
    /// Early-warning event for a high priority task
    pub fn pre_alert(task: &Task, fired_at: NaiveDateTime) -> Self {
        Self {
            task_id: task.id.clone(),
            stage: AlertStage::Pre,
            title: task.title.clone(),
            message: "Reminder in 5 minutes!".to_string(),
            fired_at,
        }
    }

    /// Main reminder event; copy depends on the task's priority
    pub fn main_alert(task: &Task, fired_at: NaiveDateTime) -> Self {
        let message = match task.priority {
            Priority::High => "Time to do it now!".to_string(),
            _ => format!("{} reminder, priority {}", task.kind_label(), task.priority),
        };

        Self {
            task_id: task.id.clone(),
            stage: AlertStage::Main,
            title: task.title.clone(),
            message,
            fired_at,
        }
    }

    /// Check if this event came from a pre alert
    pub fn is_pre(&self) -> bool {
        self.stage.is_pre()
    }
}
