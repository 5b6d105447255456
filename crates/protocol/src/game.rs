//! Game references and the job-id convention built on them.
//!
//! A game is addressed by `(source, id)`: `("romm", 42)` is ROM 42 on the
//! RomM server, `("local", 7)` is row 7 of the local library. Background jobs
//! for a game are named `"<kind>-<source>-<id>"`, and observers find them by
//! matching the `"<source>-<id>"` suffix.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source name for games addressed by their local library id.
pub const LOCAL_SOURCE: &str = "local";

/// Source name for games from the RomM catalog.
pub const ROMM_SOURCE: &str = "romm";

/// Job kind used for game installs (`install-rom-romm-42`).
pub const INSTALL_JOB_KIND: &str = "install-rom";

/// Errors produced when building a [`GameRef`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseGameRefError {
    #[error("game source must not be empty")]
    EmptySource,

    #[error("game source must not contain '-': {0}")]
    InvalidSource(String),

    #[error("invalid game id: {0}")]
    InvalidId(String),
}

/// A `(source, id)` pair identifying one game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRef {
    source: String,
    id: i64,
}

impl GameRef {
    /// Creates a reference, validating the source name and id.
    ///
    /// Sources may not contain `-` and ids may not be negative: both would
    /// make the job-id suffix ambiguous.
    pub fn new(source: impl Into<String>, id: i64) -> Result<Self, ParseGameRefError> {
        let source = source.into();
        if source.is_empty() {
            return Err(ParseGameRefError::EmptySource);
        }
        if source.contains('-') {
            return Err(ParseGameRefError::InvalidSource(source));
        }
        if id < 0 {
            return Err(ParseGameRefError::InvalidId(id.to_string()));
        }
        Ok(Self { source, id })
    }

    /// Parses a reference from the raw path segments of a request.
    pub fn parse(source: &str, id: &str) -> Result<Self, ParseGameRefError> {
        let id = id
            .parse::<i64>()
            .map_err(|_| ParseGameRefError::InvalidId(id.to_string()))?;
        Self::new(source, id)
    }

    /// Reference to a row of the local library.
    pub fn local(id: i64) -> Self {
        Self {
            source: LOCAL_SOURCE.into(),
            id,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns true if the id is a local library id.
    pub fn is_local(&self) -> bool {
        self.source == LOCAL_SOURCE
    }

    /// Returns the `"<source>-<id>"` suffix shared by all jobs for this game.
    pub fn job_suffix(&self) -> String {
        format!("{}-{}", self.source, self.id)
    }

    /// Builds the job id for a job of the given kind.
    pub fn job_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.job_suffix())
    }

    /// Returns true if `job_id` names a job for this game.
    ///
    /// The suffix must start at a `-` boundary, so `romm-42` does not match a
    /// job for `xromm-42`.
    pub fn matches_job(&self, job_id: &str) -> bool {
        let suffix = self.job_suffix();
        match job_id.strip_suffix(suffix.as_str()) {
            Some("") => true,
            Some(prefix) => prefix.ends_with('-'),
            None => false,
        }
    }
}

impl fmt::Display for GameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.id)
    }
}
