//! Status derivation.

use std::sync::Arc;

use gameshelf_jobs::TaskQueue;
use gameshelf_launch::{ActiveGameRegistry, LaunchResolver};
use gameshelf_protocol::{GameRef, GameStatus, StatusUpdate};
use tracing::debug;

const PLAYING_DETAILS: &str = "Playing";
const INSTALL_DETAILS: &str = "Install";

/// Services a status derivation reads from.
#[derive(Clone)]
pub struct StatusSources {
    pub queue: Arc<TaskQueue>,
    pub active: Arc<ActiveGameRegistry>,
    pub resolver: Arc<dyn LaunchResolver>,
}

/// Computes the current status of `game`.
///
/// Resolver failures become an `error` or `missing-emulator` update; they
/// are never retried here.
pub async fn derive_status(sources: &StatusSources, game: &GameRef) -> StatusUpdate {
    if let Some(job) = sources.queue.find_job_for(game) {
        debug!(game = %game, job = %job.id, progress = job.progress, "status from job");
        let status = job.state.as_deref().and_then(GameStatus::from_phase);
        return StatusUpdate::progress(job.progress, status);
    }

    match sources.resolver.local_game_id(game).await {
        Ok(Some(id)) if sources.active.is_playing(id) => {
            return StatusUpdate::with_details(GameStatus::Playing, PLAYING_DETAILS);
        }
        Ok(_) => {}
        Err(e) => return StatusUpdate::with_error(e.status(), e.to_string()),
    }

    match sources.resolver.resolve(game).await {
        Ok(Some(launch)) => StatusUpdate::with_details(GameStatus::Installed, launch.label),
        Ok(None) => StatusUpdate::with_details(GameStatus::Install, INSTALL_DETAILS),
        Err(e) => {
            debug!(game = %game, error = %e, "launch resolution failed");
            StatusUpdate::with_error(e.status(), e.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gameshelf_jobs::{Job, JobContext, JobError, JobFuture};
    use gameshelf_launch::{ActiveGame, LaunchError, ResolveFuture, ResolvedLaunch};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Local id the mock resolver reports for installed games.
    pub(crate) const LOCAL_ID: i64 = 7;

    #[derive(Clone)]
    pub(crate) enum Outcome {
        NotInstalled,
        Installed(&'static str),
        MissingEmulator(Vec<String>),
    }

    pub(crate) struct MockResolver {
        outcome: Mutex<Outcome>,
    }

    impl MockResolver {
        pub(crate) fn new(outcome: Outcome) -> Self {
            Self {
                outcome: Mutex::new(outcome),
            }
        }

        pub(crate) fn set(&self, outcome: Outcome) {
            *self.outcome.lock().unwrap() = outcome;
        }

        fn outcome(&self) -> Outcome {
            self.outcome.lock().unwrap().clone()
        }
    }

    impl LaunchResolver for MockResolver {
        fn resolve<'a>(&'a self, _game: &'a GameRef) -> ResolveFuture<'a, Option<ResolvedLaunch>> {
            Box::pin(async move {
                match self.outcome() {
                    Outcome::NotInstalled => Ok(None),
                    Outcome::Installed(label) => Ok(Some(ResolvedLaunch {
                        game_id: LOCAL_ID,
                        name: "Ico".into(),
                        label: label.into(),
                        command: "true".into(),
                    })),
                    Outcome::MissingEmulator(emulators) => {
                        Err(LaunchError::MissingEmulator { emulators })
                    }
                }
            })
        }

        fn local_game_id<'a>(&'a self, _game: &'a GameRef) -> ResolveFuture<'a, Option<i64>> {
            Box::pin(async move {
                match self.outcome() {
                    Outcome::NotInstalled => Ok(None),
                    _ => Ok(Some(LOCAL_ID)),
                }
            })
        }
    }

    /// Reports download progress, waits for the gate, then extracts.
    pub(crate) struct ScriptedJob {
        pub(crate) gate: Arc<Notify>,
        pub(crate) fail: Option<&'static str>,
    }

    impl Job for ScriptedJob {
        fn start<'a>(&'a self, cx: &'a JobContext) -> JobFuture<'a> {
            Box::pin(async move {
                cx.set_progress(0.0, Some("download"));
                cx.set_progress(50.0, None);
                self.gate.notified().await;
                cx.set_progress(0.0, Some("extract"));
                cx.set_progress(100.0, None);
                match self.fail {
                    Some(msg) => Err(JobError::failed(msg)),
                    None => Ok(()),
                }
            })
        }

        fn kind(&self) -> &'static str {
            "install-rom"
        }
    }

    pub(crate) fn sources(resolver: Arc<MockResolver>) -> StatusSources {
        StatusSources {
            queue: Arc::new(TaskQueue::new()),
            active: Arc::new(ActiveGameRegistry::new()),
            resolver,
        }
    }

    pub(crate) fn romm(id: i64) -> GameRef {
        GameRef::new("romm", id).unwrap()
    }

    pub(crate) fn playing() -> ActiveGame {
        ActiveGame {
            game_id: LOCAL_ID,
            name: "Ico".into(),
            command: "true".into(),
            pid: Some(4242),
        }
    }

    /// Polls until the job reaches `progress`.
    pub(crate) async fn wait_for_progress(queue: &TaskQueue, id: &str, progress: f64) {
        for _ in 0..200 {
            if queue.find_job(id).is_some_and(|j| j.progress >= progress) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached {progress}");
    }

    #[tokio::test]
    async fn not_installed_reports_install() {
        let sources = sources(Arc::new(MockResolver::new(Outcome::NotInstalled)));
        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update, StatusUpdate::with_details(GameStatus::Install, "Install"));
    }

    #[tokio::test]
    async fn installed_reports_command_label() {
        let sources = sources(Arc::new(MockResolver::new(Outcome::Installed("PCSX2"))));
        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update, StatusUpdate::with_details(GameStatus::Installed, "PCSX2"));
    }

    #[tokio::test]
    async fn missing_emulator_is_reported_verbatim() {
        let resolver = MockResolver::new(Outcome::MissingEmulator(vec!["PCSX2".into()]));
        let sources = sources(Arc::new(resolver));
        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update.status, Some(GameStatus::MissingEmulator));
        assert_eq!(update.error.as_deref(), Some("Missing One Of Emulators: PCSX2"));
    }

    #[tokio::test]
    async fn running_game_reports_playing() {
        let sources = sources(Arc::new(MockResolver::new(Outcome::Installed("PCSX2"))));
        sources.active.set(playing()).unwrap();
        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update, StatusUpdate::with_details(GameStatus::Playing, "Playing"));
    }

    #[tokio::test]
    async fn active_job_wins_over_valid_command() {
        let sources = sources(Arc::new(MockResolver::new(Outcome::Installed("PCSX2"))));
        let gate = Arc::new(Notify::new());
        let id = romm(42).job_id("install-rom");
        let handle = sources
            .queue
            .enqueue(
                id.clone(),
                ScriptedJob {
                    gate: Arc::clone(&gate),
                    fail: None,
                },
            )
            .unwrap();
        wait_for_progress(&sources.queue, &id, 50.0).await;

        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update.progress, Some(50.0));
        assert_eq!(update.status, Some(GameStatus::Download));

        // "m-42" is a suffix of the job id but not at a source boundary.
        let other = derive_status(&sources, &GameRef::new("m", 42).unwrap()).await;
        assert_eq!(other.status, Some(GameStatus::Installed));

        gate.notify_one();
        handle.finished().await;
        let update = derive_status(&sources, &romm(42)).await;
        assert_eq!(update.status, Some(GameStatus::Installed));
    }
}
