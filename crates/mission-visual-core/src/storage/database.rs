//! SQLite-based challenge storage.
//!
//! Each user's collection is kept as one JSON snapshot row, replaced whole
//! on every save. A side table maps challenge ids to owners so ownership
//! can be checked without decoding other users' snapshots. Both tables are
//! written in a single transaction.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{data_dir, ChallengeStore};
use crate::challenge::Challenge;
use crate::error::StoreError;

/// SQLite database for challenge snapshots.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/mission-visual.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("mission-visual.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS challenge_snapshots (
                user_id  TEXT PRIMARY KEY,
                payload  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS challenge_owners (
                challenge_id TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_challenge_owners_user_id ON challenge_owners(user_id);",
        )?;
        Ok(())
    }
}

impl ChallengeStore for SqliteStore {
    fn load_challenges(&self, user_id: &str) -> Result<Vec<Challenge>, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM challenge_snapshots WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_challenges(&mut self, user_id: &str, challenges: &[Challenge]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(challenges)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO challenge_snapshots (user_id, payload) VALUES (?1, ?2)",
            params![user_id, payload],
        )?;
        tx.execute(
            "DELETE FROM challenge_owners WHERE user_id = ?1",
            params![user_id],
        )?;
        for challenge in challenges {
            tx.execute(
                "INSERT OR REPLACE INTO challenge_owners (challenge_id, user_id) VALUES (?1, ?2)",
                params![challenge.id, user_id],
            )?;
        }
        tx.commit()?;
        debug!(user_id, challenges = challenges.len(), "snapshot written");
        Ok(())
    }

    fn owner_of(&self, challenge_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_id FROM challenge_owners WHERE challenge_id = ?1",
                params![challenge_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}
