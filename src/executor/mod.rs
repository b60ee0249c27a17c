// Task executor: tasks, observers, and the completion protocol

pub mod task;
pub mod task_executor;

pub use task::{
    BufferingObserver, LoggingObserver, Task, TaskEvent, TaskId, TaskLifecycle, TaskMeta,
    TaskObserver, TaskWork,
};
pub use task_executor::{TaskBatch, TaskExecutor, TaskResult};
