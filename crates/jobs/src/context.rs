//! Job trait and the per-run execution context.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::JobError;
use crate::types::{JobEvent, JobSnapshot, JobStatus};

/// Boxed future returned by [`Job::start`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'a>>;

/// A unit of background work.
///
/// The body reports progress through the context and must observe
/// [`JobContext::cancelled`] itself; nothing interrupts it from outside.
pub trait Job: Send + Sync {
    /// Runs the job body.
    fn start<'a>(&'a self, cx: &'a JobContext) -> JobFuture<'a>;

    /// Short label for logs and snapshots (`"install-rom"`).
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct RunState {
    progress: f64,
    state: Option<String>,
    running: bool,
    completed: bool,
    error: Option<String>,
    aborted: bool,
}

/// Execution context of one job run.
pub struct JobContext {
    id: String,
    kind: &'static str,
    run: Mutex<RunState>,
    token: CancellationToken,
    events: broadcast::Sender<JobEvent>,
    done: watch::Sender<bool>,
}

impl JobContext {
    /// Creates a context that publishes on `events`.
    pub fn new(
        id: impl Into<String>,
        kind: &'static str,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id: id.into(),
            kind,
            run: Mutex::new(RunState::default()),
            token: CancellationToken::new(),
            events,
            done,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Runs `job` to completion and emits its terminal events.
    ///
    /// Errors and panics inside the body are recorded and published; nothing
    /// propagates to the caller.
    pub async fn start(&self, job: &dyn Job) {
        self.execute(job).await;
        self.end();
    }

    /// Runs the body and records the terminal result, without `Ended`.
    pub(crate) async fn execute(&self, job: &dyn Job) {
        self.lock().running = true;
        info!(job = %self.id, kind = self.kind, "job started");

        let result = match AssertUnwindSafe(job.start(self)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(JobError::Panicked(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(()) => {
                self.lock().completed = true;
                info!(job = %self.id, "job completed");
                self.emit(JobEvent::Completed {
                    id: self.id.clone(),
                });
            }
            Err(e) => {
                let message = e.to_string();
                self.lock().error = Some(message.clone());
                error!(job = %self.id, error = %message, "job failed");
                self.emit(JobEvent::Error {
                    id: self.id.clone(),
                    error: message,
                });
            }
        }
    }

    /// Publishes `Ended` and resolves every [`finished`](Self::finished) waiter.
    pub(crate) fn end(&self) {
        self.emit(JobEvent::Ended {
            id: self.id.clone(),
        });
        self.done.send_replace(true);
    }

    /// Records progress, clamped to `[0, 100]`.
    ///
    /// When `state` is `None` the previous phase label is kept.
    pub fn set_progress(&self, progress: f64, state: Option<&str>) {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 100.0)
        };
        let state = {
            let mut run = self.lock();
            run.progress = progress;
            if let Some(state) = state {
                run.state = Some(state.to_string());
            }
            run.state.clone()
        };
        debug!(job = %self.id, progress, state = ?state, "job progress");
        self.emit(JobEvent::Progress {
            id: self.id.clone(),
            progress,
            state,
        });
    }

    /// Cancels the job. Only the first call has any effect.
    ///
    /// Returns false if the job was already aborted.
    pub fn abort(&self, reason: Option<&str>) -> bool {
        {
            let mut run = self.lock();
            if run.aborted {
                return false;
            }
            run.aborted = true;
        }
        info!(job = %self.id, reason = ?reason, "job aborted");
        self.token.cancel();
        self.emit(JobEvent::Abort {
            id: self.id.clone(),
            reason: reason.map(str::to_string),
        });
        true
    }

    /// Returns true once the job has been aborted.
    pub fn cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token fired by [`abort`](Self::abort), for bodies that need to select on it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn status(&self) -> JobStatus {
        status_of(&self.lock())
    }

    pub fn progress(&self) -> f64 {
        self.lock().progress
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let run = self.lock();
        JobSnapshot {
            id: self.id.clone(),
            kind: self.kind.to_string(),
            progress: run.progress,
            state: run.state.clone(),
            status: status_of(&run),
            error: run.error.clone(),
        }
    }

    /// Resolves once `Ended` has been published.
    pub async fn finished(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Returns true once `Ended` has been published.
    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    fn emit(&self, event: JobEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish()
    }
}

fn status_of(run: &RunState) -> JobStatus {
    if run.completed {
        JobStatus::Completed
    } else if run.error.is_some() {
        JobStatus::Error
    } else if run.aborted {
        JobStatus::Aborted
    } else if run.running {
        JobStatus::Running
    } else {
        JobStatus::Waiting
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobEventKind;

    struct FnJob<F>(F);

    impl<F> Job for FnJob<F>
    where
        F: Fn(&JobContext) -> Result<(), JobError> + Send + Sync,
    {
        fn start<'a>(&'a self, cx: &'a JobContext) -> JobFuture<'a> {
            Box::pin(async move { (self.0)(cx) })
        }

        fn kind(&self) -> &'static str {
            "test"
        }
    }

    struct PanicJob;

    fn explode() -> Result<(), JobError> {
        panic!("exploded")
    }

    impl Job for PanicJob {
        fn start<'a>(&'a self, _cx: &'a JobContext) -> JobFuture<'a> {
            Box::pin(async move { explode() })
        }

        fn kind(&self) -> &'static str {
            "panic"
        }
    }

    fn context() -> (JobContext, broadcast::Receiver<JobEvent>) {
        let (tx, rx) = broadcast::channel(64);
        (JobContext::new("test-romm-1", "test", tx), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn success_emits_completed_then_ended() {
        let (cx, mut rx) = context();
        assert_eq!(cx.status(), JobStatus::Waiting);

        cx.start(&FnJob(|cx: &JobContext| {
            cx.set_progress(50.0, Some("download"));
            Ok(())
        }))
        .await;

        let kinds: Vec<_> = drain(&mut rx).iter().map(JobEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                JobEventKind::Progress,
                JobEventKind::Completed,
                JobEventKind::Ended
            ]
        );
        assert_eq!(cx.status(), JobStatus::Completed);
        assert!(cx.is_finished());
    }

    #[tokio::test]
    async fn failure_emits_error_with_message() {
        let (cx, mut rx) = context();
        cx.start(&FnJob(|_: &JobContext| Err(JobError::failed("disk full"))))
            .await;

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            JobEvent::Error {
                id: "test-romm-1".into(),
                error: "disk full".into()
            }
        );
        assert_eq!(events[1].kind(), JobEventKind::Ended);
        assert_eq!(cx.status(), JobStatus::Error);
        assert_eq!(cx.snapshot().error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn panic_becomes_error_event() {
        let (cx, mut rx) = context();
        cx.start(&PanicJob).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            JobEvent::Error { error, .. } => assert!(error.contains("exploded")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(cx.status(), JobStatus::Error);
    }

    #[tokio::test]
    async fn single_terminal_transition_after_abort() {
        let (cx, mut rx) = context();
        cx.start(&FnJob(|cx: &JobContext| {
            cx.abort(Some("user"));
            if cx.cancelled() {
                return Err(JobError::Aborted(Some("user".into())));
            }
            Ok(())
        }))
        .await;

        let kinds: Vec<_> = drain(&mut rx).iter().map(JobEvent::kind).collect();
        let terminal = kinds
            .iter()
            .filter(|k| matches!(k, JobEventKind::Completed | JobEventKind::Error))
            .count();
        assert_eq!(terminal, 1);
        assert_eq!(kinds.iter().filter(|k| **k == JobEventKind::Abort).count(), 1);
        assert_eq!(kinds.last(), Some(&JobEventKind::Ended));
    }

    #[test]
    fn abort_fires_once() {
        let (cx, mut rx) = context();
        assert!(cx.abort(Some("first")));
        assert!(!cx.abort(Some("second")));
        assert!(cx.cancelled());
        assert_eq!(cx.status(), JobStatus::Aborted);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![JobEvent::Abort {
                id: "test-romm-1".into(),
                reason: Some("first".into())
            }]
        );
    }

    #[test]
    fn progress_is_clamped_and_state_sticky() {
        let (cx, mut rx) = context();
        cx.set_progress(150.0, Some("extract"));
        cx.set_progress(-3.0, None);

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            JobEvent::Progress {
                id: "test-romm-1".into(),
                progress: 100.0,
                state: Some("extract".into())
            }
        );
        assert_eq!(
            events[1],
            JobEvent::Progress {
                id: "test-romm-1".into(),
                progress: 0.0,
                state: Some("extract".into())
            }
        );
        let snap = cx.snapshot();
        assert_eq!(snap.state.as_deref(), Some("extract"));
        assert_eq!(snap.kind, "test");
    }

    #[tokio::test]
    async fn finished_resolves_after_end() {
        let (cx, _rx) = context();
        cx.start(&FnJob(|_: &JobContext| Ok(()))).await;
        tokio::time::timeout(std::time::Duration::from_secs(1), cx.finished())
            .await
            .unwrap();
    }
}
