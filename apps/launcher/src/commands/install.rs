use gameshelf_install::{InstallJob, InstallOptions};
use gameshelf_jobs::JobHandle;
use gameshelf_protocol::{GameRef, ROMM_SOURCE};

use super::CommandError;
use crate::state::AppState;

/// Starts installing `game` unless another job is running.
pub fn install(
    state: &AppState,
    game: &GameRef,
    options: InstallOptions,
) -> Result<JobHandle, CommandError> {
    if game.source() != ROMM_SOURCE {
        return Err(CommandError::UnsupportedSource(game.source().to_string()));
    }
    let deps = state
        .install_deps()
        .ok_or(CommandError::CatalogNotConfigured)?;

    let job = InstallJob::new(game.id(), options, deps);
    let id = job.job_id();
    match state.queue.enqueue_if_idle(id.clone(), job)? {
        Some(handle) => {
            tracing::info!(job = %id, game = %game, ?options, "install started");
            Ok(handle)
        }
        None => {
            tracing::warn!(game = %game, "install refused, queue busy");
            Err(CommandError::Busy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::state;
    use gameshelf_catalog::{
        Asset, Catalog, CatalogError, CatalogFuture, PlatformRecord, ProgressFn, RomRecord,
    };
    use gameshelf_jobs::JobStatus;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Catalog whose downloads never finish until cancelled.
    struct StalledCatalog;

    impl Catalog for StalledCatalog {
        fn get_rom(&self, _id: i64) -> CatalogFuture<'_, RomRecord> {
            Box::pin(async { Err(CatalogError::NotConfigured) })
        }

        fn get_platform(&self, _id: i64) -> CatalogFuture<'_, PlatformRecord> {
            Box::pin(async { Err(CatalogError::NotConfigured) })
        }

        fn fetch_asset<'a>(&'a self, _path: &'a str) -> CatalogFuture<'a, Asset> {
            Box::pin(async { Err(CatalogError::NotConfigured) })
        }

        fn download_rom<'a>(
            &'a self,
            _id: i64,
            _dest_dir: &'a Path,
            cancel: CancellationToken,
            _on_progress: ProgressFn<'a>,
        ) -> CatalogFuture<'a, PathBuf> {
            Box::pin(async move {
                cancel.cancelled().await;
                Err(CatalogError::Cancelled)
            })
        }
    }

    fn romm(id: i64) -> GameRef {
        GameRef::new(ROMM_SOURCE, id).unwrap()
    }

    #[tokio::test]
    async fn second_install_is_refused_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), Some(Arc::new(StalledCatalog)));

        let first = install(&state, &romm(1), InstallOptions::default()).unwrap();
        assert_eq!(first.id(), "install-rom-romm-1");
        let err = install(&state, &romm(2), InstallOptions::default()).unwrap_err();
        assert!(matches!(err, CommandError::Busy));

        state.shutdown().await;
        assert_eq!(first.snapshot().status, JobStatus::Error);
        assert!(!state.queue.has_active());

        let err = install(&state, &romm(2), InstallOptions::default()).unwrap_err();
        assert!(matches!(err, CommandError::Queue(_)));
    }

    #[tokio::test]
    async fn only_catalog_games_can_be_installed() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), Some(Arc::new(StalledCatalog)));
        let err = install(&state, &GameRef::local(3), InstallOptions::default()).unwrap_err();
        assert!(matches!(err, CommandError::UnsupportedSource(s) if s == "local"));
    }

    #[tokio::test]
    async fn install_needs_a_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), None);
        let err = install(&state, &romm(1), InstallOptions::default()).unwrap_err();
        assert!(matches!(err, CommandError::CatalogNotConfigured));
    }
}
