//! Game install pipeline.
//!
//! # Pipeline
//!
//! 1. **Download**: fetch the ROM archive from the catalog (`download` phase)
//! 2. **Extract**: unpack it into the download directory (`extract` phase)
//! 3. **Metadata**: fetch the ROM and platform records, cover and screenshots
//! 4. **Commit**: record platform, game and screenshots in one transaction
//!
//! Cancellation is observed by the download, between archive entries and
//! right before the commit. Files already written stay on disk.

pub mod error;
pub mod extract;
pub mod job;

// Re-export primary types for convenience.
pub use error::InstallError;
pub use extract::extract_zip;
pub use job::{InstallDeps, InstallJob, InstallOptions};
