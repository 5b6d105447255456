//! Emulator catalog: which systems exist, how to launch them, and where
//! their emulators live on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LaunchError;

/// Catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../data/emulators.json");

/// Launch command template of a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    #[serde(default)]
    pub label: Option<String>,
    pub command: String,
}

/// One emulated system (`ps2`, `snes`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDef {
    pub name: String,
    #[serde(default)]
    pub fullname: Option<String>,
    /// Accepted ROM file extensions, e.g. `.iso`.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub commands: Vec<CommandTemplate>,
}

/// Where to look for one emulator executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emulator {
    pub name: String,
    /// Executable names searched on `PATH`.
    #[serde(default)]
    pub system_paths: Vec<String>,
    /// Absolute candidate paths, matched literally (no globbing).
    #[serde(default)]
    pub static_paths: Vec<String>,
}

/// Maps a catalog source's platform slug to a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMapping {
    pub source: String,
    pub source_slug: String,
    pub system: String,
}

/// Systems, emulators and source mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorCatalog {
    #[serde(default)]
    pub systems: Vec<SystemDef>,
    #[serde(default)]
    pub emulators: Vec<Emulator>,
    #[serde(default)]
    pub mappings: Vec<SystemMapping>,
}

impl EmulatorCatalog {
    /// Parses the catalog shipped with the binary.
    pub fn builtin() -> Result<Self, LaunchError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, LaunchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a catalog file.
    pub fn load(path: &Path) -> Result<Self, LaunchError> {
        let data = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&data)?;
        debug!(
            path = %path.display(),
            systems = catalog.systems.len(),
            emulators = catalog.emulators.len(),
            "emulator catalog loaded"
        );
        Ok(catalog)
    }

    pub fn system(&self, name: &str) -> Option<&SystemDef> {
        self.systems.iter().find(|s| s.name == name)
    }

    pub fn emulator(&self, name: &str) -> Option<&Emulator> {
        self.emulators.iter().find(|e| e.name == name)
    }

    /// System name mapped from a source's platform slug.
    pub fn system_for(&self, source: &str, source_slug: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.source == source && m.source_slug == source_slug)
            .map(|m| m.system.as_str())
    }

    /// Locates an emulator executable: `system_paths` on `PATH` first, then
    /// the first existing `static_paths` entry. On Windows both also try the
    /// `PATHEXT` extensions. Unknown emulators resolve to `None`.
    pub fn locate_executable(&self, name: &str) -> Option<PathBuf> {
        let emulator = self.emulator(name)?;
        let pathext = path_extensions();
        let found = emulator
            .system_paths
            .iter()
            .find_map(|bin| find_executable_in_path(bin, pathext.as_deref()))
            .or_else(|| {
                emulator.static_paths.iter().find_map(|path| {
                    executable_candidates(path, pathext.as_deref())
                        .into_iter()
                        .map(PathBuf::from)
                        .find(|p| p.exists())
                })
            });
        debug!(emulator = name, path = ?found, "emulator lookup");
        found
    }

    /// Emulator name to executable map for every emulator that can be found.
    pub fn installed_emulators(&self) -> HashMap<String, PathBuf> {
        self.emulators
            .iter()
            .filter_map(|e| self.locate_executable(&e.name).map(|p| (e.name.clone(), p)))
            .collect()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(windows)]
fn path_extensions() -> Option<String> {
    Some(std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".into()))
}

#[cfg(not(windows))]
fn path_extensions() -> Option<String> {
    None
}

/// File names to try for `name`: the name itself, then one per `pathext`
/// extension unless the name already ends in one of them.
fn executable_candidates(name: &str, pathext: Option<&str>) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    let Some(pathext) = pathext else {
        return candidates;
    };
    let extensions: Vec<String> = pathext
        .split(';')
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();
    let lower = name.to_lowercase();
    if extensions.iter().any(|ext| lower.ends_with(ext.as_str())) {
        return candidates;
    }
    candidates.extend(extensions.iter().map(|ext| format!("{name}{ext}")));
    candidates
}

fn find_executable_in_path(name: &str, pathext: Option<&str>) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let dirs = std::env::split_paths(&path_var).collect::<Vec<_>>();
    find_executable_in_dirs(name, &dirs, pathext)
}

fn find_executable_in_dirs(name: &str, dirs: &[PathBuf], pathext: Option<&str>) -> Option<PathBuf> {
    if name.trim().is_empty() {
        return None;
    }
    let candidates = executable_candidates(name, pathext);
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|candidate| is_executable(candidate))
}
