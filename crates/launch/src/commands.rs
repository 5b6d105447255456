//! Launch command expansion.
//!
//! Command templates reference variables as `%NAME%`:
//!
//! - `%EMULATOR_<NAME>%`: custom override, else the located executable
//! - `%ROM%`: first ROM file found for the game
//! - `%ESPATH%`: the download directory
//! - anything else: an environment variable
//!
//! A command is valid only when every variable resolved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use tracing::debug;
use walkdir::WalkDir;

use crate::emulators::{CommandTemplate, EmulatorCatalog, SystemDef};
use crate::error::LaunchError;

static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%]+)%").expect("variable pattern is valid"));

/// Inputs of command expansion that come from configuration.
#[derive(Debug, Clone, Default)]
pub struct CommandEnv {
    /// Root that game paths are relative to.
    pub download_dir: PathBuf,
    /// Emulator name to executable path, overriding catalog lookup.
    pub custom_emulators: HashMap<String, String>,
}

/// One expanded command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub label: Option<String>,
    pub command: String,
    pub valid: bool,
    /// Emulator referenced by the template, if any.
    pub emulator: Option<String>,
}

/// Expands every command of `system_slug` for the game at `game_path`
/// (relative to the download directory).
pub fn valid_launch_commands(
    catalog: &EmulatorCatalog,
    system_slug: &str,
    game_path: &str,
    env: &CommandEnv,
) -> Result<Vec<LaunchCommand>, LaunchError> {
    let system = catalog
        .system(system_slug)
        .ok_or_else(|| LaunchError::UnknownSystem(system_slug.to_string()))?;
    if system.extensions.is_empty() {
        return Err(LaunchError::NoExtensions(system_slug.to_string()));
    }

    let full_path = env.download_dir.join(game_path);
    let rom = find_rom_file(system, &full_path)?;
    debug!(system = system_slug, rom = %rom.display(), "rom file selected");

    Ok(system
        .commands
        .iter()
        .map(|template| expand(catalog, template, &rom, env))
        .collect())
}

fn find_rom_file(system: &SystemDef, path: &Path) -> Result<PathBuf, LaunchError> {
    let extensions = system.extensions.join(",");
    let metadata = std::fs::metadata(path)
        .map_err(|_| LaunchError::RomPathMissing(path.display().to_string()))?;

    if metadata.is_dir() {
        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .find(|p| has_extension(system, p))
            .ok_or(LaunchError::NoRomFile(extensions))
    } else if has_extension(system, path) {
        Ok(path.to_path_buf())
    } else {
        Err(LaunchError::InvalidRomFile(extensions))
    }
}

fn has_extension(system: &SystemDef, path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    system
        .extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

fn expand(
    catalog: &EmulatorCatalog,
    template: &CommandTemplate,
    rom: &Path,
    env: &CommandEnv,
) -> LaunchCommand {
    let mut emulator = None;
    let mut valid = true;

    let command = VAR_PATTERN
        .replace_all(&template.command, |caps: &Captures<'_>| {
            let key = &caps[1];
            let value = if let Some(name) = key.strip_prefix("EMULATOR_") {
                emulator = Some(name.to_string());
                env.custom_emulators
                    .get(name)
                    .map(|p| quote_path(p))
                    .or_else(|| {
                        catalog
                            .locate_executable(name)
                            .map(|p| quote_path(&p.to_string_lossy()))
                    })
            } else {
                match key {
                    "ROM" => Some(quote_path(&rom.to_string_lossy())),
                    "ESPATH" => Some(quote_path(&env.download_dir.to_string_lossy())),
                    _ => std::env::var(key).ok(),
                }
            };
            value.unwrap_or_else(|| {
                valid = false;
                String::new()
            })
        })
        .into_owned();

    LaunchCommand {
        label: template.label.clone(),
        command,
        valid,
        emulator,
    }
}

/// Wraps a path in double quotes when it contains whitespace so that
/// [`split_command`](crate::process::split_command) keeps it as one argument.
fn quote_path(path: &str) -> String {
    if path.contains(char::is_whitespace) {
        format!("\"{path}\"")
    } else {
        path.to_string()
    }
}
