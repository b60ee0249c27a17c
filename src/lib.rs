//! Concurrent activity composition and task execution.
//!
//! Activities transform a polymorphic data model (`Scalar` / `Vector`)
//! and compose sequentially or in parallel. Parallel fan-out delegates
//! to a pluggable execution engine for concurrency and to the task
//! executor's completion-signal protocol for deterministic, position-
//! preserving fan-in.

// Core infrastructure modules
pub mod core;

// Data model and shared state
pub mod context;
pub mod model;

// Execution: engines, tasks, completion tracking
pub mod engine;
pub mod executor;

// Activities and their composition tree
pub mod activity;

// Re-exports for convenience
pub use crate::core::errors::{Result, StrandError};
pub use activity::{
    Activity, Composition, EngineConfig, FailureMarker, ParallelGroup, PartialFailureMode,
};
pub use context::Context;
pub use engine::{EngineKind, ExecutionEngine, PendingWork};
pub use executor::{
    BufferingObserver, LoggingObserver, Task, TaskBatch, TaskEvent, TaskExecutor, TaskId,
    TaskLifecycle, TaskMeta, TaskObserver, TaskResult,
};
pub use model::{DataItem, Scalar, Vector};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Uppercase;

    #[async_trait]
    impl Activity for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        async fn apply(&self, _ctx: &Context, scalar: Scalar) -> Result<DataItem> {
            let text = scalar
                .value()
                .as_str()
                .ok_or_else(|| StrandError::activity("uppercase expects a string"))?;
            Ok(DataItem::scalar(text.to_uppercase()))
        }
    }

    struct Suffix(&'static str);

    #[async_trait]
    impl Activity for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        async fn apply(&self, _ctx: &Context, scalar: Scalar) -> Result<DataItem> {
            let text = scalar
                .value()
                .as_str()
                .ok_or_else(|| StrandError::activity("suffix expects a string"))?;
            Ok(DataItem::scalar(format!("{text}{}", self.0)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sequential_containing_parallel_end_to_end() {
        let ctx = Arc::new(Context::new());
        ctx.set("run", "e2e");

        // uppercase, then fan the same scalar out to two suffixers
        let fan_out = ParallelGroup::new(&EngineConfig::fixed(2))
            .unwrap()
            .with_child(Composition::leaf(Suffix("-left")))
            .with_child(Composition::leaf(Suffix("-right")));
        let pipeline = Composition::sequential(vec![
            Composition::leaf(Uppercase),
            Composition::parallel(fan_out),
        ]);

        let result = pipeline
            .perform(Arc::clone(&ctx), DataItem::scalar("go"))
            .await
            .unwrap();
        assert_eq!(result.into_value(), json!(["GO-left", "GO-right"]));
        assert_eq!(ctx.get("run"), Some(json!("e2e")));
    }

    #[tokio::test]
    async fn element_wise_default_over_vectors() {
        let ctx = Context::new();
        let input = DataItem::vector(vec![json!("a"), json!("b")]);
        let result = Uppercase.perform(&ctx, input).await.unwrap();
        assert_eq!(result.into_value(), json!(["A", "B"]));
    }
}
