//! Connection owner and high-level library operations.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gameshelf_protocol::GameRef;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info};

use crate::error::LibraryError;
use crate::rows::{find_platform_by_any_identifier, insert_game, insert_platform, insert_screenshots};
use crate::schema;
use crate::types::{LocalGame, NewInstall, PlatformIdentifiers, PlatformRow};

/// SQLite-backed local library. One connection, serialized by a mutex.
#[derive(Debug)]
pub struct LibraryStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl LibraryStore {
    /// Opens (creating if missing) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::install(&conn)?;
        info!(path = %path.display(), "library opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;
        schema::install(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `f` against the connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LibraryError>,
    ) -> Result<T, LibraryError> {
        f(&self.lock())
    }

    /// Runs `f` inside a transaction, committing only if it returns `Ok`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, LibraryError>,
    ) -> Result<T, LibraryError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Records an install: platform (reused or inserted), game and
    /// screenshots, all in one transaction. Returns the new game id.
    pub fn commit_install(&self, install: &NewInstall) -> Result<i64, LibraryError> {
        self.transaction(|tx| {
            let platform_id =
                match find_platform_by_any_identifier(tx, &install.platform.identifiers())? {
                    Some(id) => id,
                    None => insert_platform(tx, &install.platform)?,
                };
            let game_id = insert_game(tx, &install.game, platform_id)?;
            insert_screenshots(tx, game_id, &install.screenshots)?;
            info!(
                game_id,
                platform_id,
                screenshots = install.screenshots.len(),
                "install committed"
            );
            Ok(game_id)
        })
    }

    /// Finds a platform id by its external identifiers.
    pub fn find_platform_id(&self, ids: &PlatformIdentifiers) -> Result<Option<i64>, LibraryError> {
        self.with_connection(|conn| find_platform_by_any_identifier(conn, ids))
    }

    pub fn find_platform(&self, id: i64) -> Result<Option<PlatformRow>, LibraryError> {
        self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, slug, name, es_slug, cover_type FROM platforms WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(PlatformRow {
                            id: row.get(0)?,
                            slug: row.get(1)?,
                            name: row.get(2)?,
                            es_slug: row.get(3)?,
                            cover_type: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Looks up the installed game for `game`.
    ///
    /// `local` references match the row id; any other source matches
    /// `(source, source_id)`.
    pub fn find_game(&self, game: &GameRef) -> Result<Option<LocalGame>, LibraryError> {
        const COLUMNS: &str = "SELECT g.id, g.name, g.path_fs, g.platform_id, p.es_slug \
                               FROM games g LEFT JOIN platforms p ON p.id = g.platform_id";
        self.with_connection(|conn| {
            let map = |row: &rusqlite::Row<'_>| {
                Ok(LocalGame {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    path_fs: row.get(2)?,
                    platform_id: row.get(3)?,
                    platform_es_slug: row.get(4)?,
                })
            };
            let found = if game.is_local() {
                conn.query_row(&format!("{COLUMNS} WHERE g.id = ?1"), [game.id()], map)
                    .optional()?
            } else {
                conn.query_row(
                    &format!("{COLUMNS} WHERE g.source = ?1 AND g.source_id = ?2"),
                    params![game.source(), game.id()],
                    map,
                )
                .optional()?
            };
            debug!(game = %game, found = found.is_some(), "library lookup");
            Ok(found)
        })
    }

    /// Deletes the game row; its screenshots cascade.
    ///
    /// Returns the deleted game, or `None` if it was not installed.
    pub fn delete_game(&self, game: &GameRef) -> Result<Option<LocalGame>, LibraryError> {
        let Some(local) = self.find_game(game)? else {
            return Ok(None);
        };
        self.with_connection(|conn| {
            conn.execute("DELETE FROM games WHERE id = ?1", [local.id])?;
            Ok(())
        })?;
        info!(game = %game, game_id = local.id, "game deleted");
        Ok(Some(local))
    }

    pub fn screenshot_ids(&self, game_id: i64) -> Result<Vec<i64>, LibraryError> {
        self.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM screenshots WHERE game_id = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map([game_id], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// Number of rows in `games`.
    pub fn game_count(&self) -> Result<i64, LibraryError> {
        self.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?)
        })
    }

    /// Number of rows in `platforms`.
    pub fn platform_count(&self) -> Result<i64, LibraryError> {
        self.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM platforms", [], |row| row.get(0))?)
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
