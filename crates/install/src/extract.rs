//! Zip extraction.

use std::fs::File;
use std::io;
use std::path::{Component, Path};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::InstallError;

/// Returns false for absolute paths and paths escaping the destination.
fn is_safe_relative_path(path: &Path) -> bool {
    path.components().all(|component| {
        !matches!(
            component,
            Component::Prefix(_) | Component::RootDir | Component::ParentDir
        )
    })
}

/// Extracts `archive_path` into `dest_dir`.
///
/// `on_entry(done, total)` is called after every entry, skipped ones
/// included. The token is checked between entries. Returns the number of
/// entries written.
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    cancel: &CancellationToken,
    mut on_entry: impl FnMut(usize, usize),
) -> Result<usize, InstallError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let total = archive.len();
    let mut written = 0;

    for index in 0..total {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        let mut entry = archive.by_index(index)?;
        let name = entry.name().replace('\\', "/");
        let entry_path = Path::new(&name);
        if name.is_empty() || !is_safe_relative_path(entry_path) {
            warn!(entry = %name, "skipping unsafe archive entry");
            on_entry(index + 1, total);
            continue;
        }

        let out_path = dest_dir.join(entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&out_path)?;
            io::copy(&mut entry, &mut outfile)?;
            written += 1;
            debug!(path = %out_path.display(), "extracted");
        }
        on_entry(index + 1, total);
    }

    Ok(written)
}
