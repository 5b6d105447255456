use std::sync::Arc;

use gameshelf_catalog::{Catalog, CatalogError, RommClient};
use gameshelf_install::InstallDeps;
use gameshelf_jobs::TaskQueue;
use gameshelf_launch::{
    ActiveGameRegistry, CommandEnv, EmulatorCatalog, LaunchResolver, LibraryLaunchResolver,
};
use gameshelf_library::LibraryStore;
use gameshelf_status::StatusSources;

use crate::config::AppConfig;

/// Services shared by every command, constructed once per process.
pub struct AppState {
    pub config: AppConfig,
    pub queue: Arc<TaskQueue>,
    pub library: Arc<LibraryStore>,
    /// `None` when no catalog address is configured.
    pub catalog: Option<Arc<dyn Catalog>>,
    pub emulators: Arc<EmulatorCatalog>,
    pub active: Arc<ActiveGameRegistry>,
    pub resolver: Arc<dyn LaunchResolver>,
}

impl AppState {
    /// Opens the library and builds every service from `config`.
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let library = Arc::new(LibraryStore::open(config.database_path())?);
        let catalog: Option<Arc<dyn Catalog>> = match RommClient::new(&config.romm()) {
            Ok(client) => Some(Arc::new(client)),
            Err(CatalogError::NotConfigured) => {
                tracing::warn!("catalog address not configured, installs are disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };
        Self::with_services(config, library, catalog)
    }

    pub fn with_services(
        config: AppConfig,
        library: Arc<LibraryStore>,
        catalog: Option<Arc<dyn Catalog>>,
    ) -> anyhow::Result<Self> {
        let emulators = Arc::new(match &config.emulator_catalog {
            Some(path) => EmulatorCatalog::load(path)?,
            None => EmulatorCatalog::builtin()?,
        });
        let env = CommandEnv {
            download_dir: config.download_path.clone(),
            custom_emulators: config.custom_emulators.clone(),
        };
        let resolver = Arc::new(LibraryLaunchResolver::new(
            Arc::clone(&library),
            Arc::clone(&emulators),
            env,
        ));

        tracing::info!(
            download_path = %config.download_path.display(),
            catalog = catalog.is_some(),
            "gameshelf state initialized"
        );

        Ok(Self {
            config,
            queue: Arc::new(TaskQueue::new()),
            library,
            catalog,
            emulators,
            active: Arc::new(ActiveGameRegistry::new()),
            resolver,
        })
    }

    pub fn status_sources(&self) -> StatusSources {
        StatusSources {
            queue: Arc::clone(&self.queue),
            active: Arc::clone(&self.active),
            resolver: Arc::clone(&self.resolver),
        }
    }

    /// Install dependencies, if a catalog is configured.
    pub fn install_deps(&self) -> Option<InstallDeps> {
        let catalog = self.catalog.as_ref()?;
        Some(InstallDeps {
            catalog: Arc::clone(catalog),
            library: Arc::clone(&self.library),
            emulators: Arc::clone(&self.emulators),
            download_dir: self.config.download_path.clone(),
        })
    }

    /// Closes the queue, aborting running jobs, and waits for them to end.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down, closing task queue");
        self.queue.close().await;
    }
}
