//! Launching installed games.
//!
//! - [`EmulatorCatalog`]: systems, emulators and source mappings
//! - [`valid_launch_commands`]: expands a system's command templates for one game
//! - [`LaunchResolver`]: picks a runnable command for a game, or a typed failure
//! - [`ActiveGameRegistry`]: the single running game and its exit notifications
//! - [`run_game`]: spawns a resolved command and tracks it until exit

pub mod active;
pub mod commands;
pub mod emulators;
pub mod error;
pub mod process;
pub mod resolver;

// Re-export primary types for convenience.
pub use active::{ActiveGame, ActiveGameRegistry, GameExited};
pub use commands::{CommandEnv, LaunchCommand, valid_launch_commands};
pub use emulators::{CommandTemplate, Emulator, EmulatorCatalog, SystemDef, SystemMapping};
pub use error::{ActiveGameError, LaunchError, PlayError};
pub use process::{run_game, split_command};
pub use resolver::{LaunchResolver, LibraryLaunchResolver, ResolveFuture, ResolvedLaunch};
