//! Shared types for GameShelf.
//!
//! Everything that crosses a crate boundary or goes out on the status feed
//! lives here: the `(source, id)` game reference and its job-id convention,
//! the derived [`GameStatus`], and the frames pushed to status observers.

pub mod game;
pub mod status;

// Re-export primary types for convenience.
pub use game::{GameRef, INSTALL_JOB_KIND, LOCAL_SOURCE, ParseGameRefError, ROMM_SOURCE};
pub use status::{GameStatus, StatusEvent, StatusFrame, StatusUpdate};
