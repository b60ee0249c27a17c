//! Composite activities
//!
//! Compositions form an owned tree: a leaf activity, a sequential chain
//! threading output into input, or a parallel fan-out that delegates to
//! an execution engine and the task executor for completion tracking.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::activity::config::{EngineConfig, PartialFailureMode};
use crate::activity::Activity;
use crate::context::Context;
use crate::core::errors::{Result, StrandError};
use crate::executor::task::{Task, TaskId, TaskObserver};
use crate::executor::task_executor::TaskExecutor;
use crate::model::{DataItem, Scalar, Vector};

/// Owned tree of activities
pub enum Composition {
    /// A single activity
    Leaf(Arc<dyn Activity>),
    /// Children run in registration order, output of child *i* feeding
    /// child *i+1*; the first failure aborts the chain
    Sequential(Vec<Composition>),
    /// Children run concurrently over an execution engine
    Parallel(ParallelGroup),
}

impl Composition {
    pub fn leaf(activity: impl Activity + 'static) -> Self {
        Self::Leaf(Arc::new(activity))
    }

    pub fn sequential(children: Vec<Composition>) -> Self {
        Self::Sequential(children)
    }

    pub fn parallel(group: ParallelGroup) -> Self {
        Self::Parallel(group)
    }

    /// Label used for logs and task labels
    pub fn label(&self) -> &str {
        match self {
            Self::Leaf(activity) => activity.name(),
            Self::Sequential(_) => "sequential",
            Self::Parallel(_) => "parallel",
        }
    }

    /// Evaluate the composition tree against an input.
    ///
    /// The context is shared by reference with every activity in the
    /// tree, including parallel siblings.
    pub fn perform(&self, ctx: Arc<Context>, input: DataItem) -> BoxFuture<'_, Result<DataItem>> {
        Box::pin(async move {
            match self {
                Self::Leaf(activity) => activity.perform(&ctx, input).await,
                Self::Sequential(children) => {
                    let mut data = input;
                    for child in children {
                        data = child.perform(Arc::clone(&ctx), data).await?;
                    }
                    Ok(data)
                }
                Self::Parallel(group) => group.perform(ctx, input).await,
            }
        })
    }
}

/// Parallel fan-out over N child compositions.
///
/// A scalar input is copied to every child; a vector input binds element
/// *i* to child *i* (sizes must match). Results come back as a vector
/// ordered by child registration position, not completion order.
pub struct ParallelGroup {
    children: Vec<Arc<Composition>>,
    mode: PartialFailureMode,
    executor: TaskExecutor,
}

impl ParallelGroup {
    /// Build a group owning the engine described by the configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let engine = config.build_engine()?;
        Ok(Self {
            children: Vec::new(),
            mode: config.on_partial_failure,
            executor: TaskExecutor::new(Arc::new(engine)),
        })
    }

    /// Register a child; position is registration order
    pub fn with_child(mut self, child: Composition) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Attach a lifecycle observer to the group's executor
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.executor.add_observer(observer);
        self
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Release the owned engine. Further performs fail with
    /// `EngineClosed`.
    pub fn dispose(&self) -> Result<()> {
        self.executor.engine().dispose()
    }

    async fn perform(&self, ctx: Arc<Context>, input: DataItem) -> Result<DataItem> {
        let child_count = self.children.len();
        // The size invariant is checked before anything is submitted.
        let inputs: Vec<DataItem> = match input {
            DataItem::Scalar(scalar) => (0..child_count)
                .map(|_| DataItem::Scalar(scalar.clone()))
                .collect(),
            DataItem::Vector(vector) => {
                if vector.len() != child_count {
                    return Err(StrandError::size_mismatch(child_count, vector.len()));
                }
                vector
                    .into_values()
                    .into_iter()
                    .map(|value| DataItem::Scalar(Scalar::new(value)))
                    .collect()
            }
        };

        let tasks = self
            .children
            .iter()
            .zip(inputs)
            .map(|(child, child_input)| {
                let child = Arc::clone(child);
                let ctx = Arc::clone(&ctx);
                let label = child.label().to_owned();
                Task::new(async move { child.perform(ctx, child_input).await }).with_label(label)
            })
            .collect();

        let batch = self.executor.submit(tasks).await?;
        let results = self.executor.wait_for_all(batch).await?;
        debug!(children = child_count, mode = ?self.mode, "parallel fan-in");

        match self.mode {
            PartialFailureMode::FailFast => {
                let mut items = Vec::with_capacity(results.len());
                for (position, result) in results.into_iter().enumerate() {
                    match result.outcome {
                        Ok(item) => items.push(item.into_value()),
                        Err(err) => {
                            return Err(StrandError::branch(position, result.task_id, err))
                        }
                    }
                }
                Ok(DataItem::Vector(Vector::from_values(items)))
            }
            PartialFailureMode::CollectAll => {
                let items = results
                    .into_iter()
                    .enumerate()
                    .map(|(position, result)| match result.outcome {
                        Ok(item) => item.into_value(),
                        Err(err) => FailureMarker::new(position, result.task_id, &err).to_value(),
                    })
                    .collect();
                Ok(DataItem::Vector(Vector::from_values(items)))
            }
        }
    }
}

impl Drop for ParallelGroup {
    fn drop(&mut self) {
        // Exactly-once disposal for owners that never called dispose().
        if !self.executor.engine().is_closed() {
            let _ = self.executor.engine().dispose();
        }
    }
}

/// Structured per-position error marker produced in collect-all mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureMarker {
    pub position: usize,
    pub task_id: TaskId,
    pub category: String,
    pub message: String,
}

impl FailureMarker {
    fn new(position: usize, task_id: TaskId, error: &StrandError) -> Self {
        Self {
            position,
            task_id,
            category: error.category().to_string(),
            message: error.to_string(),
        }
    }

    /// The value stored at the failed position of a collect-all vector
    pub fn to_value(&self) -> Value {
        json!({
            "activity_failure": {
                "position": self.position,
                "task_id": self.task_id,
                "category": self.category,
                "message": self.message,
            }
        })
    }

    /// Recognize a marker inside a collect-all result vector
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.get("activity_failure")?.clone()).ok()
    }
}
