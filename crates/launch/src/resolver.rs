//! Launch resolution for library games.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gameshelf_library::LibraryStore;
use gameshelf_protocol::GameRef;
use tracing::debug;

use crate::commands::{CommandEnv, valid_launch_commands};
use crate::emulators::EmulatorCatalog;
use crate::error::LaunchError;

/// Shell pseudo-emulator, never reported as missing.
const OS_SHELL: &str = "OS-SHELL";

/// Fallback label when a command template has none.
const DEFAULT_LABEL: &str = "Play";

/// Boxed future returned by [`LaunchResolver`] methods.
pub type ResolveFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LaunchError>> + Send + 'a>>;

/// A runnable launch command for one installed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLaunch {
    /// Local library id.
    pub game_id: i64,
    pub name: String,
    pub label: String,
    pub command: String,
}

/// Resolves games to launch commands.
///
/// `Ok(None)` means the game is not installed; `Err` is a typed failure for
/// an installed game that cannot be launched.
pub trait LaunchResolver: Send + Sync {
    fn resolve<'a>(&'a self, game: &'a GameRef) -> ResolveFuture<'a, Option<ResolvedLaunch>>;

    /// Local library id of `game`, if installed.
    fn local_game_id<'a>(&'a self, game: &'a GameRef) -> ResolveFuture<'a, Option<i64>>;
}

/// Resolver backed by the local library and the emulator catalog.
pub struct LibraryLaunchResolver {
    library: Arc<LibraryStore>,
    catalog: Arc<EmulatorCatalog>,
    env: Arc<CommandEnv>,
}

impl LibraryLaunchResolver {
    pub fn new(library: Arc<LibraryStore>, catalog: Arc<EmulatorCatalog>, env: CommandEnv) -> Self {
        Self {
            library,
            catalog,
            env: Arc::new(env),
        }
    }

    fn resolve_blocking(
        library: &LibraryStore,
        catalog: &EmulatorCatalog,
        env: &CommandEnv,
        game: &GameRef,
    ) -> Result<Option<ResolvedLaunch>, LaunchError> {
        let Some(local) = library.find_game(game)? else {
            return Ok(None);
        };
        let system = local.platform_es_slug.ok_or(LaunchError::MissingPlatform)?;
        let path = local.path_fs.ok_or(LaunchError::MissingPath)?;

        let commands = valid_launch_commands(catalog, &system, &path, env)?;
        if let Some(cmd) = commands.iter().find(|c| c.valid) {
            debug!(game = %game, command = %cmd.command, "launch command resolved");
            return Ok(Some(ResolvedLaunch {
                game_id: local.id,
                name: local.name.unwrap_or_default(),
                label: cmd.label.clone().unwrap_or_else(|| DEFAULT_LABEL.into()),
                command: cmd.command.clone(),
            }));
        }

        let emulators = commands
            .into_iter()
            .filter_map(|c| c.emulator)
            .filter(|e| e != OS_SHELL)
            .collect();
        Err(LaunchError::MissingEmulator { emulators })
    }
}

impl LaunchResolver for LibraryLaunchResolver {
    fn resolve<'a>(&'a self, game: &'a GameRef) -> ResolveFuture<'a, Option<ResolvedLaunch>> {
        let library = Arc::clone(&self.library);
        let catalog = Arc::clone(&self.catalog);
        let env = Arc::clone(&self.env);
        let game = game.clone();
        Box::pin(async move {
            // Walks the filesystem and probes PATH.
            tokio::task::spawn_blocking(move || {
                Self::resolve_blocking(&library, &catalog, &env, &game)
            })
            .await
            .map_err(|e| LaunchError::Task(e.to_string()))?
        })
    }

    fn local_game_id<'a>(&'a self, game: &'a GameRef) -> ResolveFuture<'a, Option<i64>> {
        let library = Arc::clone(&self.library);
        let game = game.clone();
        Box::pin(async move {
            // Waits on the library connection lock.
            let local = tokio::task::spawn_blocking(move || library.find_game(&game))
                .await
                .map_err(|e| LaunchError::Task(e.to_string()))??;
            Ok(local.map(|g| g.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gameshelf_library::{NewGame, NewInstall, NewPlatform};
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    const CATALOG: &str = r#"{
        "systems": [
            {"name": "ps2", "extensions": [".iso"],
             "commands": [
                {"label": "PCSX2", "command": "%EMULATOR_PCSX2% %ROM%"},
                {"label": "Shell", "command": "%EMULATOR_OS-SHELL% %ROM%"}
             ]}
        ],
        "emulators": [
            {"name": "PCSX2", "system_paths": ["gameshelf-test-no-such-binary"]},
            {"name": "OS-SHELL", "static_paths": ["/nonexistent/sh"]}
        ]
    }"#;

    struct Fixture {
        dir: tempfile::TempDir,
        library: Arc<LibraryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                library: Arc::new(LibraryStore::open_in_memory().unwrap()),
            }
        }

        fn install(&self, source_id: i64, es_slug: Option<&str>, path: Option<&str>) -> i64 {
            self.library
                .commit_install(&NewInstall {
                    platform: NewPlatform {
                        slug: format!("p{source_id}"),
                        name: "PlayStation 2".into(),
                        es_slug: es_slug.map(str::to_string),
                        ..Default::default()
                    },
                    game: NewGame {
                        source: "romm".into(),
                        source_id,
                        name: Some("Ico".into()),
                        path_fs: path.map(str::to_string),
                        ..Default::default()
                    },
                    screenshots: Vec::new(),
                })
                .unwrap()
        }

        fn resolver(&self, custom: &[(&str, &str)]) -> LibraryLaunchResolver {
            LibraryLaunchResolver::new(
                Arc::clone(&self.library),
                Arc::new(EmulatorCatalog::from_json(CATALOG).unwrap()),
                CommandEnv {
                    download_dir: self.dir.path().to_path_buf(),
                    custom_emulators: custom
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<HashMap<_, _>>(),
                },
            )
        }
    }

    fn romm(id: i64) -> GameRef {
        GameRef::new("romm", id).unwrap()
    }

    #[tokio::test]
    async fn not_installed_resolves_to_none() {
        let fx = Fixture::new();
        let resolver = fx.resolver(&[]);
        assert_eq!(resolver.resolve(&romm(1)).await.unwrap(), None);
        assert_eq!(resolver.local_game_id(&romm(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn local_lookup_does_not_hold_the_runtime_thread() {
        let fx = Fixture::new();
        let resolver = Arc::new(fx.resolver(&[]));

        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let library = Arc::clone(&fx.library);
        let holder = std::thread::spawn(move || {
            library.with_connection(|_| {
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(400));
                Ok(())
            })
        });
        locked_rx.recv().unwrap();

        let lookup = {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.local_game_id(&romm(1)).await.unwrap() })
        };

        // Timers keep firing on the single runtime thread while the lookup waits.
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(300));

        assert_eq!(lookup.await.unwrap(), None);
        holder.join().unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_emulator_lists_names_without_shell() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.dir.path().join("ps2/Ico")).unwrap();
        std::fs::write(fx.dir.path().join("ps2/Ico/ico.iso"), b"").unwrap();
        fx.install(1, Some("ps2"), Some("ps2/Ico"));

        let err = fx.resolver(&[]).resolve(&romm(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing One Of Emulators: PCSX2");
        assert_eq!(err.status(), gameshelf_protocol::GameStatus::MissingEmulator);
    }

    #[tokio::test]
    async fn valid_command_is_resolved() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.dir.path().join("ps2/Ico")).unwrap();
        std::fs::write(fx.dir.path().join("ps2/Ico/ico.iso"), b"").unwrap();
        let id = fx.install(1, Some("ps2"), Some("ps2/Ico"));

        let resolver = fx.resolver(&[("PCSX2", "/opt/pcsx2")]);
        let launch = resolver.resolve(&romm(1)).await.unwrap().unwrap();
        assert_eq!(launch.game_id, id);
        assert_eq!(launch.label, "PCSX2");
        assert_eq!(launch.name, "Ico");
        assert!(launch.command.starts_with("/opt/pcsx2 "));

        // The same game addressed by its local id.
        let local = resolver.resolve(&GameRef::local(id)).await.unwrap().unwrap();
        assert_eq!(local, launch);
        assert_eq!(resolver.local_game_id(&romm(1)).await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn missing_metadata_errors() {
        let fx = Fixture::new();
        fx.install(1, None, Some("ps2/Ico"));
        fx.install(2, Some("ps2"), None);
        let resolver = fx.resolver(&[]);

        let err = resolver.resolve(&romm(1)).await.unwrap_err();
        assert!(matches!(err, LaunchError::MissingPlatform));
        assert_eq!(err.to_string(), "Missing Platform");

        let err = resolver.resolve(&romm(2)).await.unwrap_err();
        assert!(matches!(err, LaunchError::MissingPath));
        assert_eq!(err.status(), gameshelf_protocol::GameStatus::Error);
    }
}
