use rusqlite::Connection;

use crate::error::LibraryError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS platforms (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    family_name TEXT,
    igdb_id     INTEGER UNIQUE,
    igdb_slug   TEXT UNIQUE,
    ra_id       INTEGER UNIQUE,
    moby_id     INTEGER UNIQUE,
    es_slug     TEXT UNIQUE,
    cover       BLOB,
    cover_type  TEXT,
    created_at  INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS games (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    source      TEXT,
    source_id   INTEGER UNIQUE,
    slug        TEXT UNIQUE,
    name        TEXT,
    summary     TEXT,
    path_fs     TEXT,
    igdb_id     INTEGER UNIQUE,
    ra_id       INTEGER UNIQUE,
    last_played INTEGER,
    platform_id INTEGER NOT NULL REFERENCES platforms(id) ON UPDATE CASCADE,
    cover       BLOB,
    cover_type  TEXT,
    created_at  INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS screenshots (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id      INTEGER REFERENCES games(id) ON DELETE CASCADE ON UPDATE CASCADE,
    content      BLOB NOT NULL,
    content_type TEXT
);
"#;

/// Creates missing tables. Existing tables are left untouched.
pub(crate) fn install(conn: &Connection) -> Result<(), LibraryError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
