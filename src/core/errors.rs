use thiserror::Error;

use crate::executor::task::TaskId;

/// Unified error type for the entire Strand library
#[derive(Debug, Error)]
pub enum StrandError {
    /// Business-logic failure inside a single activity
    #[error("Activity failed: {message}")]
    Activity {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The task's execution was interrupted before it finished
    #[error("Task {task_id} was cancelled")]
    Cancelled {
        task_id: TaskId,
        reason: Option<String>,
    },

    /// Submission attempted after the engine was disposed
    #[error("Execution engine is closed")]
    EngineClosed,

    /// A parallel composite received a vector whose length disagrees
    /// with its child count
    #[error("Size mismatch: {children} child activities but {elements} vector elements")]
    SizeMismatch { children: usize, elements: usize },

    /// Vector index magnitude exceeds the vector size
    #[error("Index {index} out of range for vector of size {size}")]
    IndexOutOfRange { index: i64, size: usize },

    /// A task identity was assigned more than once
    #[error("Task identity already assigned: {task_id}")]
    IdentityAssigned { task_id: TaskId },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A parallel child failed; localizes the failure to its position
    #[error("Child activity at position {position} (task {task_id}) failed")]
    Branch {
        position: usize,
        task_id: TaskId,
        #[source]
        source: Box<StrandError>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StrandError {
    /// Create an activity error
    pub fn activity<S: Into<String>>(message: S) -> Self {
        Self::Activity {
            message: message.into(),
            source: None,
        }
    }

    /// Create an activity error with a nested cause
    pub fn activity_with_source<S: Into<String>, E>(message: S, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Activity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(task_id: TaskId) -> Self {
        Self::Cancelled {
            task_id,
            reason: None,
        }
    }

    /// Create a cancellation error with a reason
    pub fn cancelled_because<S: Into<String>>(task_id: TaskId, reason: S) -> Self {
        Self::Cancelled {
            task_id,
            reason: Some(reason.into()),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a size mismatch error
    pub fn size_mismatch(children: usize, elements: usize) -> Self {
        Self::SizeMismatch { children, elements }
    }

    /// Create an index error
    pub fn index_out_of_range(index: i64, size: usize) -> Self {
        Self::IndexOutOfRange { index, size }
    }

    /// Wrap a parallel child failure with its position and identity
    pub fn branch(position: usize, task_id: TaskId, source: StrandError) -> Self {
        Self::Branch {
            position,
            task_id,
            source: Box::new(source),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable by retrying at a higher level
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Activity { .. } => true,
            Self::Cancelled { .. } => true,
            Self::Branch { source, .. } => source.is_recoverable(),
            Self::EngineClosed
            | Self::SizeMismatch { .. }
            | Self::IndexOutOfRange { .. }
            | Self::IdentityAssigned { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Activity { .. } => "activity",
            Self::Cancelled { .. } => "cancelled",
            Self::EngineClosed => "engine_closed",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::IdentityAssigned { .. } => "identity_assigned",
            Self::Configuration { .. } => "configuration",
            Self::Branch { .. } => "branch",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, StrandError>;

/// Convert from common error types
impl From<serde_json::Error> for StrandError {
    fn from(err: serde_json::Error) -> Self {
        Self::activity_with_source("JSON conversion failed", err)
    }
}

impl From<anyhow::Error> for StrandError {
    fn from(err: anyhow::Error) -> Self {
        Self::Activity {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StrandError::activity("boom");
        assert!(matches!(err, StrandError::Activity { .. }));
        assert_eq!(err.category(), "activity");
    }

    #[test]
    fn test_branch_wrapping() {
        let inner = StrandError::activity("inner failure");
        let err = StrandError::branch(3, 3, inner);
        assert_eq!(err.category(), "branch");
        if let StrandError::Branch {
            position,
            task_id,
            source,
        } = err
        {
            assert_eq!(position, 3);
            assert_eq!(task_id, 3);
            assert!(matches!(*source, StrandError::Activity { .. }));
        } else {
            panic!("Expected branch error");
        }
    }

    #[test]
    fn test_error_recoverability() {
        assert!(StrandError::activity("x").is_recoverable());
        assert!(StrandError::cancelled(0).is_recoverable());
        assert!(!StrandError::EngineClosed.is_recoverable());
        assert!(!StrandError::configuration("bad pool size").is_recoverable());
        assert!(StrandError::branch(0, 0, StrandError::activity("x")).is_recoverable());
    }

    #[test]
    fn test_from_anyhow() {
        let err: StrandError = anyhow::anyhow!("ad-hoc failure").into();
        assert_eq!(err.category(), "activity");
        assert!(err.to_string().contains("ad-hoc failure"));
    }
}
