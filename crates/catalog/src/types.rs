//! RomM API records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection settings for a RomM server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RommConfig {
    /// Base address, e.g. `http://romm.local:8080`.
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Per-user ROM state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RomUser {
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

/// ROM record as returned by `/api/roms/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RomRecord {
    pub id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub fs_path: String,
    pub fs_name: String,
    pub platform_id: i64,
    #[serde(default)]
    pub igdb_id: Option<i64>,
    #[serde(default)]
    pub ra_id: Option<i64>,
    #[serde(default)]
    pub path_cover_large: Option<String>,
    #[serde(default)]
    pub merged_screenshots: Vec<String>,
    #[serde(default)]
    pub rom_user: RomUser,
}

/// Platform record as returned by `/api/platforms/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub igdb_id: Option<i64>,
    #[serde(default)]
    pub igdb_slug: Option<String>,
    #[serde(default)]
    pub ra_id: Option<i64>,
    #[serde(default)]
    pub moby_id: Option<i64>,
}

/// Downloaded binary asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Asset {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}
