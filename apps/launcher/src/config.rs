//! Launcher configuration.
//!
//! Stored as JSON at `<config dir>/gameshelf/config.json`. A malformed
//! file yields defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gameshelf_catalog::RommConfig;
use serde::{Deserialize, Serialize};

/// Overrides `download_path` when set.
pub const DOWNLOAD_PATH_ENV: &str = "GAMESHELF_DOWNLOAD_PATH";

const DB_FILE: &str = "db.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub romm_address: Option<String>,
    #[serde(default)]
    pub romm_username: Option<String>,
    #[serde(default)]
    pub romm_password: Option<String>,

    /// Root directory for installed games and the library database.
    #[serde(default = "default_download_path")]
    pub download_path: PathBuf,

    /// Emulator catalog JSON. The built-in catalog is used when unset.
    #[serde(default)]
    pub emulator_catalog: Option<PathBuf>,

    /// Emulator name to executable path.
    #[serde(default)]
    pub custom_emulators: HashMap<String, String>,
}

fn default_download_path() -> PathBuf {
    home_dir().join("Games").join("gameshelf")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            romm_address: None,
            romm_username: None,
            romm_password: None,
            download_path: default_download_path(),
            emulator_catalog: None,
            custom_emulators: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the default path, then applies
    /// environment overrides. A missing file is created with defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        if !path.exists() {
            if let Err(e) = Self::default().save_to(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write default config");
            }
        }
        let mut config = Self::load_from(&path)?;
        match std::env::var(DOWNLOAD_PATH_ENV) {
            Ok(path) if !path.is_empty() => config.download_path = PathBuf::from(path),
            _ => {}
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn romm(&self) -> RommConfig {
        RommConfig {
            address: self.romm_address.clone(),
            username: self.romm_username.clone(),
            password: self.romm_password.clone(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.download_path.join(DB_FILE)
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_path() -> PathBuf {
    config_base_dir().join("gameshelf").join("config.json")
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(std::env::var(var).unwrap_or_else(|_| std::env::temp_dir().display().to_string()))
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home_dir().join(".config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.download_path.ends_with("Games/gameshelf"));
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"romm_address": "http://romm.local"}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.romm().address.as_deref(), Some("http://romm.local"));
        assert_eq!(config.download_path, default_download_path());
        assert!(config.custom_emulators.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig {
            download_path: dir.path().join("games"),
            ..Default::default()
        };
        config
            .custom_emulators
            .insert("PCSX2".into(), "/opt/pcsx2".into());

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
        assert_eq!(config.database_path(), dir.path().join("games/db.sqlite"));
    }
}
