//! Catalog trait consumed by the install pipeline.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::CatalogError;
use crate::types::{Asset, PlatformRecord, RomRecord};

/// Boxed future returned by [`Catalog`] methods.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CatalogError>> + Send + 'a>>;

/// Download progress callback, called with a percentage in `[0, 100]`.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Remote game catalog.
///
/// Implemented over HTTP by [`RommClient`](crate::RommClient); tests use
/// in-memory mocks.
pub trait Catalog: Send + Sync {
    /// Fetches one ROM record.
    fn get_rom(&self, id: i64) -> CatalogFuture<'_, RomRecord>;

    /// Fetches one platform record.
    fn get_platform(&self, id: i64) -> CatalogFuture<'_, PlatformRecord>;

    /// Fetches an asset by server-relative path (`/assets/...`).
    fn fetch_asset<'a>(&'a self, path: &'a str) -> CatalogFuture<'a, Asset>;

    /// Downloads the archive for ROM `id` into `dest_dir/{id}.zip`,
    /// overwriting any previous file. Returns the archive path.
    fn download_rom<'a>(
        &'a self,
        id: i64,
        dest_dir: &'a Path,
        cancel: CancellationToken,
        on_progress: ProgressFn<'a>,
    ) -> CatalogFuture<'a, PathBuf>;
}
