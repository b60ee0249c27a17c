//! Task executor and completion protocol
//!
//! The executor submits a bounded batch of independent tasks to an
//! execution engine and tracks completion through a dedicated signal
//! channel carrying task identities. `wait_for_all` drains exactly one
//! signal per submitted task before resolving any result, which is what
//! guarantees that results come back in submission order no matter in
//! which real-time order the tasks finished.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::errors::{Result, StrandError};
use crate::engine::{ExecutionEngine, PendingWork};
use crate::executor::task::{Task, TaskId, TaskMeta, TaskObserver};
use crate::model::DataItem;

/// Outcome of one task, keyed by its submission identity
#[derive(Debug)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub label: Option<String>,
    pub outcome: Result<DataItem>,
}

#[derive(Debug)]
struct BatchEntry {
    task_id: TaskId,
    label: Option<String>,
}

/// Pending results for one submitted batch, in submission order
#[derive(Debug)]
pub struct TaskBatch {
    entries: Vec<BatchEntry>,
    completion_rx: mpsc::UnboundedReceiver<TaskId>,
    outcomes: Arc<DashMap<TaskId, Result<DataItem>>>,
    // Keeps spawned wrappers reachable; dropping a handle detaches, it
    // never aborts.
    pending: Vec<PendingWork<()>>,
}

impl TaskBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities in submission order
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(|entry| entry.task_id).collect()
    }
}

// Publishes the task identity on every exit path of the run wrapper,
// including cancellation and panic. This send is what unblocks
// `wait_for_all`; it is registered before submission and never skipped.
struct CompletionGuard {
    task_id: TaskId,
    signal: mpsc::UnboundedSender<TaskId>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let _ = self.signal.send(self.task_id);
    }
}

/// Runs bounded batches of independent tasks on an execution engine,
/// notifying observers and tracking completion deterministically
pub struct TaskExecutor {
    engine: Arc<ExecutionEngine>,
    observers: Vec<Arc<dyn TaskObserver>>,
}

impl TaskExecutor {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self {
            engine,
            observers: Vec::new(),
        }
    }

    /// Register an observer; zero or more may be attached
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TaskObserver>) {
        self.observers.push(observer);
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Submit a batch of tasks, one pending result per task in input
    /// order.
    ///
    /// Identities `0..N` are assigned before submission. Engine refusal
    /// (a disposed engine) surfaces immediately from here, not from
    /// `wait_for_all`.
    pub async fn submit(&self, tasks: Vec<Task>) -> Result<TaskBatch> {
        let (signal_tx, completion_rx) = mpsc::unbounded_channel();
        let outcomes: Arc<DashMap<TaskId, Result<DataItem>>> =
            Arc::new(DashMap::with_capacity(tasks.len()));
        let mut entries = Vec::with_capacity(tasks.len());
        let mut pending = Vec::with_capacity(tasks.len());

        for (position, mut task) in tasks.into_iter().enumerate() {
            let task_id = position as TaskId;
            task.assign_id(task_id)?;
            let (label, work) = task.into_parts();
            let meta = TaskMeta {
                id: task_id,
                label: label.clone(),
            };
            let guard = CompletionGuard {
                task_id,
                signal: signal_tx.clone(),
            };
            let observers = self.observers.clone();
            let outcomes_map = Arc::clone(&outcomes);

            let wrapper = async move {
                let _guard = guard;
                for observer in &observers {
                    observer.on_task_starting(&meta);
                }
                for observer in &observers {
                    observer.on_task_started(&meta);
                }
                let outcome = work.await;
                if let Err(err) = &outcome {
                    debug!(task_id = meta.id, error = %err, "task failed");
                }
                for observer in &observers {
                    observer.on_task_complete(&meta, &outcome);
                }
                outcomes_map.insert(meta.id, outcome);
            };

            let handle = self.engine.submit(wrapper).await?;
            entries.push(BatchEntry { task_id, label });
            pending.push(handle);
        }

        debug!(batch_size = entries.len(), "batch submitted");
        Ok(TaskBatch {
            entries,
            completion_rx,
            outcomes,
            pending,
        })
    }

    /// Wait until every task in the batch has published its completion
    /// signal, then resolve the results in original submission order.
    ///
    /// A single task's failure never cancels its siblings; the full
    /// batch is always awaited and failed tasks carry a per-task error.
    pub async fn wait_for_all(&self, batch: TaskBatch) -> Result<Vec<TaskResult>> {
        let TaskBatch {
            entries,
            mut completion_rx,
            outcomes,
            pending,
        } = batch;

        let expected = entries.len();
        let mut received = 0usize;
        while received < expected {
            match completion_rx.recv().await {
                Some(task_id) => {
                    received += 1;
                    debug!(task_id, received, expected, "completion signal observed");
                }
                None => {
                    return Err(StrandError::internal(
                        "completion channel closed before all signals arrived",
                    ));
                }
            }
        }
        drop(pending);

        let results = entries
            .into_iter()
            .map(|entry| {
                let outcome = outcomes
                    .remove(&entry.task_id)
                    .map(|(_, outcome)| outcome)
                    .unwrap_or_else(|| {
                        warn!(task_id = entry.task_id, "task finished without an outcome");
                        Err(StrandError::cancelled_because(
                            entry.task_id,
                            "execution interrupted before completion",
                        ))
                    });
                TaskResult {
                    task_id: entry.task_id,
                    label: entry.label,
                    outcome,
                }
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn identities_follow_submission_order() {
        let executor = TaskExecutor::new(Arc::new(ExecutionEngine::serial()));
        let tasks = (0..4)
            .map(|i| Task::new(async move { Ok(DataItem::scalar(i)) }))
            .collect();
        let batch = executor.submit(tasks).await.unwrap();
        assert_eq!(batch.task_ids(), vec![0, 1, 2, 3]);
        assert_eq!(batch.len(), 4);
    }

    #[tokio::test]
    async fn empty_batch_resolves_immediately() {
        let executor = TaskExecutor::new(Arc::new(ExecutionEngine::serial()));
        let batch = executor.submit(Vec::new()).await.unwrap();
        assert!(batch.is_empty());
        let results = executor.wait_for_all(batch).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn failed_task_does_not_cancel_siblings() {
        let executor = TaskExecutor::new(Arc::new(ExecutionEngine::serial()));
        let tasks = vec![
            Task::new(async { Ok(DataItem::scalar("first")) }),
            Task::new(async { Err(StrandError::activity("middle task failed")) }),
            Task::new(async { Ok(DataItem::scalar("last")) }),
        ];
        let batch = executor.submit(tasks).await.unwrap();
        let results = executor.wait_for_all(batch).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].outcome.is_ok());
        assert!(results[1].outcome.is_err());
        assert!(results[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn disposed_engine_refuses_submission() {
        let engine = Arc::new(ExecutionEngine::growable());
        let executor = TaskExecutor::new(Arc::clone(&engine));
        engine.dispose().unwrap();
        let err = executor
            .submit(vec![Task::new(async { Ok(DataItem::scalar(1)) })])
            .await
            .unwrap_err();
        assert!(matches!(err, StrandError::EngineClosed));
    }
}
