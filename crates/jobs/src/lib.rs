//! Background job execution for GameShelf.
//!
//! A [`TaskQueue`] starts submitted [`Job`]s immediately, each inside its own
//! [`JobContext`]. Contexts own the cancellation token and progress state of
//! one run and publish lifecycle events on the queue's broadcast bus:
//!
//! 1. `Progress` while the body reports phases
//! 2. `Abort` if the job was cancelled
//! 3. exactly one of `Completed` / `Error`
//! 4. `Ended`, always last

pub mod context;
pub mod error;
pub mod queue;
pub mod types;

// Re-export primary types for convenience.
pub use context::{Job, JobContext, JobFuture};
pub use error::{JobError, QueueError};
pub use queue::{JobHandle, Subscription, TaskQueue};
pub use types::{JobEvent, JobEventKind, JobSnapshot, JobStatus};
