use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::StorageError;

/// The local SQLite database.
/// It stores favorited stories and the key-value preferences (session, markers).
///
/// The connection sits behind a mutex so the stores can be shared across tasks;
/// every statement runs under that lock, which is what serializes favorite
/// mutations and reads.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// The default location is in the user's data directory:
    /// - Linux: ~/.local/share/story-client/story_client.db
    /// - macOS: ~/Library/Application Support/story-client/story_client.db
    /// - Windows: %APPDATA%\story-client\story_client.db
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Database opened");

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Throwaway database, used by tests and by callers that opt out of persistence
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Where the database lives when no explicit path is configured
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(StorageError::NoDataDir)?;

        path.push("story-client");
        path.push("story_client.db");
        Ok(path)
    }

    /// Create all tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            // Favorites: a denormalized copy of the story, keyed by story id
            conn.execute(
                "CREATE TABLE IF NOT EXISTS story_favorite (
                    story_id        TEXT PRIMARY KEY NOT NULL,
                    name            TEXT NOT NULL,
                    description     TEXT NOT NULL,
                    photo_url       TEXT,
                    lat             REAL,
                    lon             REAL,
                    created_at      TEXT NOT NULL,
                    liked_at        INTEGER NOT NULL
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_story_favorite_liked_at
                 ON story_favorite(liked_at DESC)",
                [],
            )?;

            // Preferences: flat string key-value pairs
            conn.execute(
                "CREATE TABLE IF NOT EXISTS preferences (
                    key             TEXT PRIMARY KEY NOT NULL,
                    value           TEXT NOT NULL
                )",
                [],
            )?;

            Ok(())
        })?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Run `f` with exclusive access to the connection
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&mut *conn)?)
    }

    /// Path of the database file (`None` for in-memory databases)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("db_path", &self.db_path)
            .finish()
    }
}
