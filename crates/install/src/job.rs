//! The install job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::{join, join_all};
use gameshelf_catalog::{Asset, Catalog, PlatformRecord, RomRecord};
use gameshelf_jobs::{Job, JobContext, JobFuture};
use gameshelf_launch::EmulatorCatalog;
use gameshelf_library::{LibraryStore, NewGame, NewInstall, NewPlatform, NewScreenshot};
use gameshelf_protocol::{GameRef, INSTALL_JOB_KIND, ROMM_SOURCE};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::InstallError;
use crate::extract::extract_zip;

const PHASE_DOWNLOAD: &str = "download";
const PHASE_EXTRACT: &str = "extract";

/// Install behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Report the first progress step and stop.
    pub dry_run: bool,
    /// Skip download and extraction; create an empty game directory instead.
    pub dry_download: bool,
}

/// Services an install needs.
#[derive(Clone)]
pub struct InstallDeps {
    pub catalog: Arc<dyn Catalog>,
    pub library: Arc<LibraryStore>,
    pub emulators: Arc<EmulatorCatalog>,
    pub download_dir: PathBuf,
}

/// Installs one ROM from the catalog.
pub struct InstallJob {
    rom_id: i64,
    options: InstallOptions,
    deps: InstallDeps,
}

impl InstallJob {
    pub fn new(rom_id: i64, options: InstallOptions, deps: InstallDeps) -> Self {
        Self {
            rom_id,
            options,
            deps,
        }
    }

    /// Queue id for this install (`install-rom-romm-<id>`).
    pub fn job_id(&self) -> String {
        format!("{INSTALL_JOB_KIND}-{ROMM_SOURCE}-{}", self.rom_id)
    }

    /// Game reference of the ROM being installed.
    pub fn game(&self) -> Option<GameRef> {
        GameRef::new(ROMM_SOURCE, self.rom_id).ok()
    }

    async fn run(&self, cx: &JobContext) -> Result<(), InstallError> {
        let download_dir = &self.deps.download_dir;
        cx.set_progress(0.0, Some(PHASE_DOWNLOAD));
        tokio::fs::create_dir_all(download_dir).await?;

        if self.options.dry_run {
            info!(rom_id = self.rom_id, "dry run, skipping install");
            return Ok(());
        }

        if !self.options.dry_download {
            let archive = self.download(cx).await?;
            cx.set_progress(0.0, Some(PHASE_EXTRACT));
            self.extract(cx, archive).await?;
        }

        let rom = self.deps.catalog.get_rom(self.rom_id).await?;
        let platform = self.deps.catalog.get_platform(rom.platform_id).await?;
        let path_fs = Path::new(&rom.fs_path).join(&rom.fs_name);

        if self.options.dry_download {
            tokio::fs::create_dir_all(download_dir.join(&path_fs)).await?;
        }

        let (cover, screenshots) = self.fetch_assets(&rom).await;

        let mut new_platform = new_platform(&platform, &self.deps.emulators);
        let library = Arc::clone(&self.deps.library);
        let identifiers = new_platform.identifiers();
        let existing = tokio::task::spawn_blocking(move || library.find_platform_id(&identifiers))
            .await
            .map_err(|e| InstallError::Task(e.to_string()))??;
        if existing.is_none() {
            let icon_path = format!("/assets/platforms/{}.svg", platform.slug.to_lowercase());
            if let Some(icon) = fetch_optional(self.deps.catalog.as_ref(), &icon_path).await {
                new_platform.cover = Some(icon.data);
                new_platform.cover_type = icon.content_type;
            }
        }

        if cx.cancelled() {
            info!(rom_id = self.rom_id, "install cancelled before commit");
            return Err(InstallError::Cancelled);
        }

        let (cover, cover_type) = match cover {
            Some(asset) => (Some(asset.data), asset.content_type),
            None => (None, None),
        };
        let install = NewInstall {
            platform: new_platform,
            game: NewGame {
                source: ROMM_SOURCE.into(),
                source_id: rom.id,
                slug: rom.slug.clone(),
                name: rom.name.clone(),
                summary: rom.summary.clone(),
                path_fs: Some(path_fs.to_string_lossy().into_owned()),
                igdb_id: rom.igdb_id,
                ra_id: rom.ra_id,
                last_played: rom.rom_user.last_played,
                cover,
                cover_type,
            },
            screenshots: screenshots
                .into_iter()
                .map(|s| NewScreenshot {
                    content: s.data,
                    content_type: s.content_type,
                })
                .collect(),
        };

        let library = Arc::clone(&self.deps.library);
        let game_id = tokio::task::spawn_blocking(move || library.commit_install(&install))
            .await
            .map_err(|e| InstallError::Task(e.to_string()))??;
        info!(rom_id = self.rom_id, game_id, "install recorded");
        Ok(())
    }

    async fn download(&self, cx: &JobContext) -> Result<PathBuf, InstallError> {
        let on_progress = |progress: f64| cx.set_progress(progress, Some(PHASE_DOWNLOAD));
        let result = self
            .deps
            .catalog
            .download_rom(self.rom_id, &self.deps.download_dir, cx.token(), &on_progress)
            .await;
        match result {
            Ok(path) => Ok(path),
            Err(e) => {
                let message = e.to_string();
                cx.abort(Some(&message));
                Err(e.into())
            }
        }
    }

    async fn extract(&self, cx: &JobContext, archive: PathBuf) -> Result<(), InstallError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dest = self.deps.download_dir.clone();
        let token = cx.token();
        let source = archive.clone();

        let task = tokio::task::spawn_blocking(move || {
            extract_zip(&source, &dest, &token, |done, total| {
                let _ = tx.send(done as f64 / total as f64 * 100.0);
            })
        });

        // The channel closes when the extraction thread returns.
        while let Some(progress) = rx.recv().await {
            cx.set_progress(progress, Some(PHASE_EXTRACT));
        }
        let written = task
            .await
            .map_err(|e| InstallError::Task(e.to_string()))??;

        tokio::fs::remove_file(&archive).await?;
        debug!(rom_id = self.rom_id, files = written, "archive extracted and removed");
        Ok(())
    }

    /// Fetches the cover and all screenshots concurrently. Failures are skipped.
    async fn fetch_assets(&self, rom: &RomRecord) -> (Option<Asset>, Vec<Asset>) {
        let catalog = self.deps.catalog.as_ref();
        let cover = async {
            match rom.path_cover_large.as_deref() {
                Some(path) if !path.is_empty() => fetch_optional(catalog, path).await,
                _ => None,
            }
        };
        let screenshots = join_all(
            rom.merged_screenshots
                .iter()
                .map(|path| fetch_optional(catalog, path)),
        );
        let (cover, screenshots) = join(cover, screenshots).await;
        (cover, screenshots.into_iter().flatten().collect())
    }
}

impl Job for InstallJob {
    fn start<'a>(&'a self, cx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move { self.run(cx).await.map_err(Into::into) })
    }

    fn kind(&self) -> &'static str {
        INSTALL_JOB_KIND
    }
}

async fn fetch_optional(catalog: &dyn Catalog, path: &str) -> Option<Asset> {
    match catalog.fetch_asset(path).await {
        Ok(asset) => Some(asset),
        Err(e) => {
            warn!(path, error = %e, "asset fetch failed, skipping");
            None
        }
    }
}

fn new_platform(platform: &PlatformRecord, emulators: &EmulatorCatalog) -> NewPlatform {
    NewPlatform {
        slug: platform.slug.clone(),
        name: platform.name.clone(),
        family_name: platform.family_name.clone(),
        igdb_id: platform.igdb_id,
        igdb_slug: platform.igdb_slug.clone(),
        ra_id: platform.ra_id,
        moby_id: platform.moby_id,
        es_slug: emulators
            .system_for(ROMM_SOURCE, &platform.slug)
            .map(str::to_string),
        cover: None,
        cover_type: None,
    }
}
