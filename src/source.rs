//! Task snapshot sources
//!
//! The external store owns the tasks; the scheduler only reads full
//! snapshots through this seam. The file-backed source reads the same
//! JSON documents the store persists, so edits made while the daemon
//! runs are picked up on the next heartbeat.

use crate::domain::Task;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Supplies the current task snapshot on demand.
#[async_trait]
pub trait TaskSource: Send + Sync + 'static {
    /// The full set of tasks as of this call.
    async fn snapshot(&self) -> Result<Vec<Task>>;
}

/// Reads snapshots from a JSON file holding an array of tasks.
#[derive(Debug, Clone)]
pub struct JsonTaskSource {
    path: PathBuf,
}

impl JsonTaskSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TaskSource for JsonTaskSource {
    async fn snapshot(&self) -> Result<Vec<Task>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let tasks: Vec<Task> = serde_json::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), tasks = tasks.len(), "snapshot loaded");
        Ok(tasks)
    }
}

/// In-process source whose snapshot is set by hand. Used by tests and
/// by embedders that already hold the tasks in memory.
#[derive(Debug, Default)]
pub struct MemoryTaskSource {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Replace the snapshot returned by subsequent `snapshot` calls.
    pub fn set(&self, tasks: Vec<Task>) {
        *self.lock() = tasks;
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TaskSource for MemoryTaskSource {
    async fn snapshot(&self) -> Result<Vec<Task>> {
        Ok(self.lock().clone())
    }
}
