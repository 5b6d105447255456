//! Local game library backed by SQLite.
//!
//! Three tables: `platforms`, `games` and `screenshots`. The row helpers in
//! [`rows`] take a plain `&Connection` so they compose inside one
//! transaction; [`LibraryStore`] owns the connection and exposes the
//! higher-level operations used by installs, status and deletes.

pub mod error;
pub mod rows;
mod schema;
pub mod store;
pub mod types;

// Re-export primary types for convenience.
pub use error::LibraryError;
pub use rows::{find_platform_by_any_identifier, insert_game, insert_platform, insert_screenshots};
pub use store::LibraryStore;
pub use types::{
    LocalGame, NewGame, NewInstall, NewPlatform, NewScreenshot, PlatformIdentifiers, PlatformRow,
};
