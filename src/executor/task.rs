//! Tasks and lifecycle observers
//!
//! A `Task` is the atomic unit of concurrent work: an identity assigned
//! once by the executor, plus a boxed work future. Observers receive
//! starting/started/complete callbacks for every task in causal order.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StrandError};
use crate::model::DataItem;

/// Task identity, unique and monotonically increasing within a batch
pub type TaskId = u64;

/// The work payload carried by a task
pub type TaskWork = Pin<Box<dyn Future<Output = Result<DataItem>> + Send + 'static>>;

/// Atomic unit of concurrent work submitted to the task executor
pub struct Task {
    id: Option<TaskId>,
    label: Option<String>,
    work: TaskWork,
}

impl Task {
    /// Create a task from its work future
    pub fn new<F>(work: F) -> Self
    where
        F: Future<Output = Result<DataItem>> + Send + 'static,
    {
        Self {
            id: None,
            label: None,
            work: Box::pin(work),
        }
    }

    /// Attach a human-readable label for logs and observers
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The identity assigned by the executor, if already submitted
    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    // Identity is assigned exactly once, by the executor, before
    // submission. A second assignment is a usage error.
    pub(crate) fn assign_id(&mut self, id: TaskId) -> Result<()> {
        if let Some(existing) = self.id {
            return Err(StrandError::IdentityAssigned { task_id: existing });
        }
        self.id = Some(id);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Option<String>, TaskWork) {
        (self.label, self.work)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Task identity and label as seen by observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMeta {
    pub id: TaskId,
    pub label: Option<String>,
}

/// Lifecycle callbacks for submitted tasks.
///
/// Every observer sees starting, started and complete for a given task in
/// that causal order. Callbacks run on the task's own execution path, so
/// a slow observer delays only that task's completion signal.
pub trait TaskObserver: Send + Sync {
    fn on_task_starting(&self, _task: &TaskMeta) {}

    fn on_task_started(&self, _task: &TaskMeta) {}

    fn on_task_complete(&self, _task: &TaskMeta, _outcome: &Result<DataItem>) {}
}

/// Lifecycle event payload recorded by the buffering observer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskLifecycle {
    TaskStarting { task_id: TaskId },
    TaskStarted { task_id: TaskId },
    TaskComplete { task_id: TaskId, success: bool },
}

/// Timestamped lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub timestamp: DateTime<Utc>,
    pub label: Option<String>,
    pub event: TaskLifecycle,
}

/// Observer that logs lifecycle events through tracing
pub struct LoggingObserver;

impl TaskObserver for LoggingObserver {
    fn on_task_starting(&self, task: &TaskMeta) {
        tracing::debug!(task_id = task.id, label = task.label.as_deref(), "task starting");
    }

    fn on_task_started(&self, task: &TaskMeta) {
        tracing::debug!(task_id = task.id, label = task.label.as_deref(), "task started");
    }

    fn on_task_complete(&self, task: &TaskMeta, outcome: &Result<DataItem>) {
        match outcome {
            Ok(_) => {
                tracing::debug!(task_id = task.id, label = task.label.as_deref(), "task complete")
            }
            Err(err) => tracing::debug!(
                task_id = task.id,
                label = task.label.as_deref(),
                error = %err,
                "task failed"
            ),
        }
    }
}

/// Observer that collects timestamped lifecycle events
#[derive(Default)]
pub struct BufferingObserver {
    events: Arc<RwLock<Vec<TaskEvent>>>,
}

impl BufferingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.read().clone()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn record(&self, label: Option<&str>, event: TaskLifecycle) {
        self.events.write().push(TaskEvent {
            timestamp: Utc::now(),
            label: label.map(str::to_owned),
            event,
        });
    }
}

impl TaskObserver for BufferingObserver {
    fn on_task_starting(&self, task: &TaskMeta) {
        self.record(
            task.label.as_deref(),
            TaskLifecycle::TaskStarting { task_id: task.id },
        );
    }

    fn on_task_started(&self, task: &TaskMeta) {
        self.record(
            task.label.as_deref(),
            TaskLifecycle::TaskStarted { task_id: task.id },
        );
    }

    fn on_task_complete(&self, task: &TaskMeta, outcome: &Result<DataItem>) {
        self.record(
            task.label.as_deref(),
            TaskLifecycle::TaskComplete {
                task_id: task.id,
                success: outcome.is_ok(),
            },
        );
    }
}
