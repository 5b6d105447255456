//! Row types for the local library.

use chrono::{DateTime, Utc};

/// External identifiers used to match an incoming platform to a local row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformIdentifiers {
    pub igdb_id: Option<i64>,
    pub igdb_slug: Option<String>,
    pub ra_id: Option<i64>,
    pub slug: Option<String>,
    pub moby_id: Option<i64>,
}

/// Platform to insert.
#[derive(Debug, Clone, Default)]
pub struct NewPlatform {
    pub slug: String,
    pub name: String,
    pub family_name: Option<String>,
    pub igdb_id: Option<i64>,
    pub igdb_slug: Option<String>,
    pub ra_id: Option<i64>,
    pub moby_id: Option<i64>,
    /// Emulator catalog system name.
    pub es_slug: Option<String>,
    pub cover: Option<Vec<u8>>,
    pub cover_type: Option<String>,
}

impl NewPlatform {
    pub fn identifiers(&self) -> PlatformIdentifiers {
        PlatformIdentifiers {
            igdb_id: self.igdb_id,
            igdb_slug: self.igdb_slug.clone(),
            ra_id: self.ra_id,
            slug: Some(self.slug.clone()),
            moby_id: self.moby_id,
        }
    }
}

/// Game to insert. The platform id is assigned at commit time.
#[derive(Debug, Clone, Default)]
pub struct NewGame {
    pub source: String,
    pub source_id: i64,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    /// Install path relative to the download directory.
    pub path_fs: Option<String>,
    pub igdb_id: Option<i64>,
    pub ra_id: Option<i64>,
    pub last_played: Option<DateTime<Utc>>,
    pub cover: Option<Vec<u8>>,
    pub cover_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScreenshot {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// Everything recorded by one install, committed atomically.
#[derive(Debug, Clone, Default)]
pub struct NewInstall {
    pub platform: NewPlatform,
    pub game: NewGame,
    pub screenshots: Vec<NewScreenshot>,
}

/// Installed game joined with its platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalGame {
    pub id: i64,
    pub name: Option<String>,
    pub path_fs: Option<String>,
    pub platform_id: i64,
    pub platform_es_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub es_slug: Option<String>,
    pub cover_type: Option<String>,
}
