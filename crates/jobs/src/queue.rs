//! Task queue: starts jobs and tracks which ones are active.
//!
//! The queue is an activity tracker, not a scheduler. Every submission starts
//! its job immediately on the tokio runtime; callers that need single-flight
//! admission use [`TaskQueue::enqueue_if_idle`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gameshelf_protocol::GameRef;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{Job, JobContext};
use crate::error::QueueError;
use crate::types::{JobEvent, JobEventKind, JobSnapshot};

/// Capacity of the lifecycle event bus.
const EVENT_CAPACITY: usize = 256;

/// Reason given to jobs aborted by [`TaskQueue::close`].
pub const CLOSE_REASON: &str = "queue closed";

type Entry = (Arc<JobContext>, Arc<dyn Job>);

#[derive(Default)]
struct QueueState {
    pending: Vec<Entry>,
    active: Vec<Arc<JobContext>>,
    closed: bool,
}

/// Starts background jobs and publishes their lifecycle events.
pub struct TaskQueue {
    state: Arc<Mutex<QueueState>>,
    events: broadcast::Sender<JobEvent>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            events,
        }
    }

    /// Submits a job and starts it immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(
        &self,
        id: impl Into<String>,
        job: impl Job + 'static,
    ) -> Result<JobHandle, QueueError> {
        let mut state = self.lock();
        if state.closed {
            return Err(QueueError::Disposed);
        }
        Ok(self.submit(&mut state, id.into(), Arc::new(job)))
    }

    /// Submits a job only when no other job is active.
    ///
    /// The check and the submission happen under one lock, so two concurrent
    /// callers can never both be admitted. Returns `None` when busy.
    pub fn enqueue_if_idle(
        &self,
        id: impl Into<String>,
        job: impl Job + 'static,
    ) -> Result<Option<JobHandle>, QueueError> {
        let mut state = self.lock();
        if state.closed {
            return Err(QueueError::Disposed);
        }
        if !state.active.is_empty() || !state.pending.is_empty() {
            debug!("queue busy, submission refused");
            return Ok(None);
        }
        Ok(Some(self.submit(&mut state, id.into(), Arc::new(job))))
    }

    fn submit(&self, state: &mut QueueState, id: String, job: Arc<dyn Job>) -> JobHandle {
        let context = Arc::new(JobContext::new(id, job.kind(), self.events.clone()));
        state.pending.push((Arc::clone(&context), job));

        // Newest submission first.
        if let Some((next, job)) = state.pending.pop() {
            state.active.push(Arc::clone(&next));
            debug!(job = %next.id(), active = state.active.len(), "job dispatched");

            let queue_state = Arc::clone(&self.state);
            tokio::spawn(async move {
                next.execute(job.as_ref()).await;
                queue_state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .active
                    .retain(|c| !Arc::ptr_eq(c, &next));
                next.end();
            });
        }

        JobHandle { context }
    }

    /// Returns true while any job is pending or running.
    pub fn has_active(&self) -> bool {
        let state = self.lock();
        !state.active.is_empty() || !state.pending.is_empty()
    }

    /// Looks up a pending or active job by id.
    pub fn find_job(&self, id: &str) -> Option<JobSnapshot> {
        self.find_context(|c| c.id() == id).map(|c| c.snapshot())
    }

    /// Looks up a pending or active job for `game` by job-id suffix.
    pub fn find_job_for(&self, game: &GameRef) -> Option<JobSnapshot> {
        self.find_context(|c| game.matches_job(c.id()))
            .map(|c| c.snapshot())
    }

    fn find_context(&self, pred: impl Fn(&JobContext) -> bool) -> Option<Arc<JobContext>> {
        let state = self.lock();
        state
            .active
            .iter()
            .rev()
            .chain(state.pending.iter().map(|(c, _)| c))
            .find(|c| pred(c))
            .cloned()
    }

    /// Resolves when the named job has finished. Unknown ids resolve at once.
    pub async fn wait_for(&self, id: &str) {
        if let Some(context) = self.find_context(|c| c.id() == id) {
            context.finished().await;
        }
    }

    /// Aborts one job. Returns whether it was found.
    pub fn abort(&self, id: &str, reason: Option<&str>) -> bool {
        match self.find_context(|c| c.id() == id) {
            Some(context) => {
                context.abort(reason);
                true
            }
            None => false,
        }
    }

    /// Subscribes to every lifecycle event.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Number of live receivers on the event bus.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Calls `handler` for every event of `kind` until the subscription is dropped.
    pub fn on<F>(&self, kind: JobEventKind, handler: F) -> Subscription
    where
        F: Fn(&JobEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.kind() == kind => handler(&event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "job event handler lagging");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task }
    }

    /// Calls `handler` for the next event of `kind` only.
    pub fn once<F>(&self, kind: JobEventKind, handler: F) -> Subscription
    where
        F: FnOnce(&JobEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.kind() == kind => {
                        handler(&event);
                        break;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task }
    }

    /// Refuses new submissions, aborts every active job and waits for them.
    pub async fn close(&self) {
        let active = {
            let mut state = self.lock();
            state.closed = true;
            state.pending.clear();
            state.active.clone()
        };
        info!(active = active.len(), "closing task queue");

        for context in &active {
            context.abort(Some(CLOSE_REASON));
        }
        for context in &active {
            context.finished().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    context: Arc<JobContext>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        self.context.id()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.context.snapshot()
    }

    /// Resolves once the job has ended and left the active set.
    pub async fn finished(&self) {
        self.context.finished().await;
    }

    pub fn abort(&self, reason: Option<&str>) -> bool {
        self.context.abort(reason)
    }
}

/// Event handler registration. Dropping it detaches the handler.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Returns true once the handler task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
