//! Library store error types.

/// Errors produced by the local library store.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Task(String),
}
