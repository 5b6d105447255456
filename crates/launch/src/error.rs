//! Launch error types.

use gameshelf_library::LibraryError;
use gameshelf_protocol::GameStatus;

/// Reasons a game cannot be launched.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Missing One Of Emulators: {}", .emulators.join(","))]
    MissingEmulator { emulators: Vec<String> },

    #[error("Missing Platform")]
    MissingPlatform,

    #[error("Missing Path")]
    MissingPath,

    #[error("Could not find system '{0}'")]
    UnknownSystem(String),

    #[error("No extensions listed for system '{0}'")]
    NoExtensions(String),

    #[error("Provided rom path is missing: '{0}'")]
    RomPathMissing(String),

    #[error("Could not find valid rom file. Must be a file that ends in '{0}'")]
    NoRomFile(String),

    #[error("Invalid Rom File. Must be a file that ends in '{0}'")]
    InvalidRomFile(String),

    #[error("library error: {0}")]
    Library(#[from] LibraryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("resolver task failed: {0}")]
    Task(String),
}

impl LaunchError {
    /// Status reported to observers for this failure.
    pub fn status(&self) -> GameStatus {
        match self {
            Self::MissingEmulator { .. } => GameStatus::MissingEmulator,
            _ => GameStatus::Error,
        }
    }
}

/// Invariant violations of the running-game slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActiveGameError {
    #[error("{name} currently running")]
    AlreadyRunning { name: String },
}

/// Errors from running a game process.
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error(transparent)]
    Active(#[from] ActiveGameError),

    #[error("empty launch command")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("game exited with code {0}")]
    ExitCode(i32),
}
