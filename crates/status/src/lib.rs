//! Live status feeds for games.
//!
//! A game's status is derived from three sources, first match wins:
//!
//! 1. an install job whose id ends in `<source>-<id>`
//! 2. the running game, when it is this one
//! 3. launch resolution for the installed game
//!
//! [`StatusStream`] pushes the initial derivation and then relays job events
//! and recomputes on game exit, until it is closed or dropped.

pub mod derive;
pub mod stream;

// Re-export primary types for convenience.
pub use derive::{StatusSources, derive_status};
pub use stream::StatusStream;
