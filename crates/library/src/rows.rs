//! Row-level helpers. All take a `&Connection` so a `Transaction` can be
//! passed in to group several writes.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::LibraryError;
use crate::types::{NewGame, NewPlatform, NewScreenshot, PlatformIdentifiers};

/// Finds a platform matching any of the given identifiers.
///
/// Identifiers are tried in order `igdb_id`, `igdb_slug`, `ra_id`, `slug`,
/// `moby_id`; the first one that matches a row wins.
pub fn find_platform_by_any_identifier(
    conn: &Connection,
    ids: &PlatformIdentifiers,
) -> Result<Option<i64>, LibraryError> {
    if let Some(igdb_id) = ids.igdb_id {
        if let Some(id) = platform_id_where(conn, "igdb_id", &igdb_id)? {
            return Ok(Some(id));
        }
    }
    if let Some(igdb_slug) = &ids.igdb_slug {
        if let Some(id) = platform_id_where(conn, "igdb_slug", igdb_slug)? {
            return Ok(Some(id));
        }
    }
    if let Some(ra_id) = ids.ra_id {
        if let Some(id) = platform_id_where(conn, "ra_id", &ra_id)? {
            return Ok(Some(id));
        }
    }
    if let Some(slug) = &ids.slug {
        if let Some(id) = platform_id_where(conn, "slug", slug)? {
            return Ok(Some(id));
        }
    }
    if let Some(moby_id) = ids.moby_id {
        if let Some(id) = platform_id_where(conn, "moby_id", &moby_id)? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

fn platform_id_where(
    conn: &Connection,
    column: &'static str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<i64>, LibraryError> {
    let sql = format!("SELECT id FROM platforms WHERE {column} = ?1 LIMIT 1");
    let id = conn
        .query_row(&sql, [value], |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// Inserts a platform and returns its id.
pub fn insert_platform(conn: &Connection, platform: &NewPlatform) -> Result<i64, LibraryError> {
    conn.execute(
        "INSERT INTO platforms (slug, name, family_name, igdb_id, igdb_slug, ra_id, moby_id, \
         es_slug, cover, cover_type) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            platform.slug,
            platform.name,
            platform.family_name,
            platform.igdb_id,
            platform.igdb_slug,
            platform.ra_id,
            platform.moby_id,
            platform.es_slug,
            platform.cover,
            platform.cover_type,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(platform_id = id, slug = %platform.slug, "platform inserted");
    Ok(id)
}

/// Inserts a game under `platform_id` and returns its id.
pub fn insert_game(
    conn: &Connection,
    game: &NewGame,
    platform_id: i64,
) -> Result<i64, LibraryError> {
    conn.execute(
        "INSERT INTO games (source, source_id, slug, name, summary, path_fs, igdb_id, ra_id, \
         last_played, platform_id, cover, cover_type) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            game.source,
            game.source_id,
            game.slug,
            game.name,
            game.summary,
            game.path_fs,
            game.igdb_id,
            game.ra_id,
            game.last_played.map(|t| t.timestamp()),
            platform_id,
            game.cover,
            game.cover_type,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(game_id = id, source = %game.source, source_id = game.source_id, "game inserted");
    Ok(id)
}

/// Inserts screenshots for `game_id`. Returns the number of rows written.
pub fn insert_screenshots(
    conn: &Connection,
    game_id: i64,
    screenshots: &[NewScreenshot],
) -> Result<usize, LibraryError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO screenshots (game_id, content, content_type) VALUES (?1, ?2, ?3)",
    )?;
    for shot in screenshots {
        stmt.execute(params![game_id, shot.content, shot.content_type])?;
    }
    Ok(screenshots.len())
}
