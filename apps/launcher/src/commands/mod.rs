//! Launcher commands.

pub mod delete;
pub mod install;
pub mod play;
pub mod status;

use gameshelf_jobs::QueueError;
use gameshelf_launch::{LaunchError, PlayError};
use gameshelf_library::LibraryError;

/// Errors returned by launcher commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("another job is already running")]
    Busy,

    #[error("{0}")]
    Conflict(String),

    #[error("game {0} is not installed")]
    NotInstalled(String),

    #[error("source '{0}' cannot be installed from")]
    UnsupportedSource(String),

    #[error("catalog address is not configured")]
    CatalogNotConfigured,

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Play(#[from] PlayError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use gameshelf_catalog::Catalog;
    use gameshelf_library::{LibraryStore, NewGame, NewInstall, NewPlatform};

    use crate::config::AppConfig;
    use crate::state::AppState;

    /// State over an in-memory library with downloads under `dir`.
    pub(crate) fn state(dir: &Path, catalog: Option<Arc<dyn Catalog>>) -> AppState {
        let mut config = AppConfig {
            download_path: dir.to_path_buf(),
            ..Default::default()
        };
        config.custom_emulators.insert("PCSX2".into(), "true".into());
        let library = Arc::new(LibraryStore::open_in_memory().unwrap());
        AppState::with_services(config, library, catalog).unwrap()
    }

    /// Records an installed PS2 game at `ps2/<name>` with one ROM file.
    pub(crate) fn install_ps2(state: &AppState, source_id: i64, name: &str) -> i64 {
        let game_dir = state.config.download_path.join("ps2").join(name);
        std::fs::create_dir_all(&game_dir).unwrap();
        std::fs::write(game_dir.join("game.iso"), b"iso").unwrap();
        state
            .library
            .commit_install(&NewInstall {
                platform: NewPlatform {
                    slug: "ps2".into(),
                    name: "PlayStation 2".into(),
                    es_slug: Some("ps2".into()),
                    ..Default::default()
                },
                game: NewGame {
                    source: "romm".into(),
                    source_id,
                    slug: Some(name.to_lowercase()),
                    name: Some(name.into()),
                    path_fs: Some(format!("ps2/{name}")),
                    ..Default::default()
                },
                screenshots: Vec::new(),
            })
            .unwrap()
    }
}
