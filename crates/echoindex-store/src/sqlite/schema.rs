//! SQLite schema for the code index
//!
//! Table and index names are derived from one validated base name so several
//! indexes can share a database file.

use crate::error::{StoreError, StoreResult};
use crate::models::validate_table_name;
use rusqlite::{Connection, OptionalExtension};

/// SQLite pragmas for bulk loading
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -128000;     -- 128MB cache
PRAGMA temp_store = MEMORY;
"#;

/// Names of the objects making up one index
#[derive(Debug, Clone)]
pub struct Schema {
    pub rows: String,
    pub meta: String,
    pub code_index: String,
}

impl Schema {
    pub fn new(table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            rows: table.to_string(),
            meta: format!("{}_meta", table),
            code_index: format!("{}_code", table),
        })
    }

    /// Create tables if missing. No index on `code` yet: it is built once
    /// after the bulk load.
    pub fn create(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(WRITE_PRAGMAS)?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    code INTEGER NOT NULL,
                    time INTEGER,
                    track_id TEXT NOT NULL
                )",
                self.rows
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT)",
                self.meta
            ),
            [],
        )?;
        Ok(())
    }

    /// Confirm an existing database carries this schema.
    pub fn verify(&self, conn: &Connection) -> StoreResult<()> {
        for table in [&self.rows, &self.meta] {
            let found: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                return Err(StoreError::Schema(format!("missing table '{}'", table)));
            }
        }
        Ok(())
    }

    /// Create the index on `code` and refresh planner statistics.
    pub fn create_code_index(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (code)",
                self.code_index, self.rows
            ),
            [],
        )?;
        conn.execute("ANALYZE", [])?;
        Ok(())
    }

    pub fn has_code_index(&self, conn: &Connection) -> StoreResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
            [&self.code_index],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn set_meta(&self, conn: &Connection, key: &str, value: &str) -> StoreResult<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
                self.meta
            ),
            [key, value],
        )?;
        Ok(())
    }

    pub fn get_meta(&self, conn: &Connection, key: &str) -> StoreResult<Option<String>> {
        let value = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", self.meta),
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}
