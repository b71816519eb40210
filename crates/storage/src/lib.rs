#![forbid(unsafe_code)]

mod error;
mod run_cache;
mod sessions;

pub use error::StoreError;

use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "prove_it.db";
const SCHEMA_VERSION: &str = "1";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        install_schema(&conn)?;
        tracing::debug!(db = %db_path.display(), "store opened");

        Ok(Self { conn, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
          session_id TEXT PRIMARY KEY,
          root TEXT NOT NULL,
          started_at_ms INTEGER NOT NULL,
          is_repo INTEGER NOT NULL,
          revision TEXT,
          dirty_signature TEXT
        );

        CREATE TABLE IF NOT EXISTS run_cache (
          root TEXT PRIMARY KEY,
          ran_at_ms INTEGER NOT NULL,
          revision TEXT,
          dirty_signature TEXT,
          ok INTEGER NOT NULL,
          exit_code INTEGER NOT NULL,
          duration_ms INTEGER NOT NULL,
          output_tail TEXT NOT NULL
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    let stored = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params!["schema_version"],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .unwrap_or_default();
    if stored != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            expected: SCHEMA_VERSION.to_string(),
            stored,
        });
    }
    Ok(())
}

fn root_key(root: &Path) -> Result<&str, StoreError> {
    root.to_str()
        .ok_or(StoreError::InvalidInput("root path must be valid UTF-8"))
}
