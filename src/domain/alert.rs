//! Alert keying for the scheduler's timer table

use super::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which alert of an occurrence this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStage {
    /// Early warning ahead of the main reminder
    Pre,
    /// The reminder itself; firing it schedules the next occurrence
    Main,
}

impl AlertStage {
    pub fn is_pre(&self) -> bool {
        matches!(self, AlertStage::Pre)
    }

    pub fn is_main(&self) -> bool {
        matches!(self, AlertStage::Main)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStage::Pre => "pre",
            AlertStage::Main => "main",
        }
    }
}

impl fmt::Display for AlertStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composite key identifying one live alert: a task owns at most one
/// live alert per stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub task_id: TaskId,
    pub stage: AlertStage,
}

impl AlertKey {
    pub fn new(task_id: &str, stage: AlertStage) -> Self {
        Self {
            task_id: task_id.to_string(),
            stage,
        }
    }

    pub fn pre(task_id: &str) -> Self {
        Self::new(task_id, AlertStage::Pre)
    }

    pub fn main(task_id: &str) -> Self {
        Self::new(task_id, AlertStage::Main)
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task_id, self.stage)
    }
}
