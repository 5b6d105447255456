//! Job and queue error types.

/// Errors returned by a job body.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),

    #[error("{}", .0.as_deref().unwrap_or("aborted"))]
    Aborted(Option<String>),

    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors returned by [`TaskQueue`](crate::TaskQueue) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("task queue is closed")]
    Disposed,
}
