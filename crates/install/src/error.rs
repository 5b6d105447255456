//! Install error types.

use gameshelf_jobs::JobError;

/// Errors produced by an install.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error(transparent)]
    Catalog(#[from] gameshelf_catalog::CatalogError),

    #[error(transparent)]
    Library(#[from] gameshelf_library::LibraryError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("install cancelled")]
    Cancelled,

    #[error("install task failed: {0}")]
    Task(String),
}

impl From<InstallError> for JobError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::Cancelled => JobError::Aborted(Some(err.to_string())),
            other => JobError::Failed(other.to_string()),
        }
    }
}
