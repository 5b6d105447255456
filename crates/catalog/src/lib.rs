//! Client for the RomM catalog server.
//!
//! [`Catalog`] is the narrow interface the install pipeline consumes;
//! [`RommClient`] implements it over HTTP with optional basic credentials.

pub mod catalog;
pub mod client;
pub mod error;
pub mod types;

// Re-export primary types for convenience.
pub use catalog::{Catalog, CatalogFuture, ProgressFn};
pub use client::RommClient;
pub use error::CatalogError;
pub use types::{Asset, PlatformRecord, RomRecord, RomUser, RommConfig};
