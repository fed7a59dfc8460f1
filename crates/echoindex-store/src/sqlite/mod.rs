//! SQLite-backed index store
//!
//! One connection guarded by a mutex; every call runs on tokio's blocking
//! pool so the loader's flush is a single awaited operation.

pub mod schema;

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::backend::IndexStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{keys, to_u64, IndexRow, IndexStatus, RunInfo, StoreStats};
pub use schema::Schema;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    schema: Arc<Schema>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create a store file.
    pub fn open(path: &Path, table: &str) -> StoreResult<Self> {
        let schema = Schema::new(table)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path)?;
        schema.create(&conn)?;

        Ok(Self::from_parts(conn, schema, Some(path.to_path_buf())))
    }

    /// Open a store that must already exist.
    pub fn open_existing(path: &Path, table: &str) -> StoreResult<Self> {
        let schema = Schema::new(table)?;

        if !path.exists() {
            return Err(StoreError::Open {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        schema.verify(&conn)?;

        Ok(Self::from_parts(conn, schema, Some(path.to_path_buf())))
    }

    /// Private in-memory store, mostly for tests.
    pub fn open_in_memory(table: &str) -> StoreResult<Self> {
        let schema = Schema::new(table)?;
        let conn = Connection::open_in_memory()?;
        schema.create(&conn)?;

        Ok(Self::from_parts(conn, schema, None))
    }

    fn from_parts(conn: Connection, schema: Schema, path: Option<PathBuf>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: Arc::new(schema),
            path,
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &Schema) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let schema = Arc::clone(&self.schema);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *guard, &*schema)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl IndexStore for SqliteStore {
    async fn begin_run(&self, run: &RunInfo) -> StoreResult<()> {
        let run = run.clone();
        self.with_conn(move |conn, schema| {
            let tx = conn.transaction()?;
            schema.set_meta(&tx, keys::STATUS, IndexStatus::Loading.as_str())?;
            schema.set_meta(&tx, keys::CODES_ONLY, &run.codes_only.to_string())?;
            schema.set_meta(&tx, keys::INPUTS, &run.inputs.join("\n"))?;
            schema.set_meta(&tx, keys::STARTED_AT, &chrono::Utc::now().to_rfc3339())?;
            schema.set_meta(&tx, keys::WRITER_VERSION, env!("CARGO_PKG_VERSION"))?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn insert_batch(&self, rows: Vec<IndexRow>) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        self.with_conn(move |conn, schema| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(&format!(
                    "INSERT INTO {} (code, time, track_id) VALUES (?1, ?2, ?3)",
                    schema.rows
                ))?;
                for row in &rows {
                    stmt.execute(params![row.code, row.time, row.track_id])?;
                }
            }
            tx.commit()?;
            log::debug!("sqlite: committed {} rows", rows.len());
            Ok(())
        })
        .await
    }

    async fn build_index(&self) -> StoreResult<()> {
        self.with_conn(|conn, schema| {
            schema.create_code_index(conn)?;
            schema.set_meta(conn, keys::STATUS, IndexStatus::Indexed.as_str())?;
            schema.set_meta(conn, keys::INDEXED_AT, &chrono::Utc::now().to_rfc3339())?;
            Ok(())
        })
        .await
    }

    async fn status(&self) -> StoreResult<IndexStatus> {
        self.with_conn(|conn, schema| {
            let status = IndexStatus::from_meta(schema.get_meta(conn, keys::STATUS)?.as_deref());
            // Status says indexed but the index itself is gone
            if status.is_complete() && !schema.has_code_index(conn)? {
                return Ok(IndexStatus::Loading);
            }
            Ok(status)
        })
        .await
    }

    async fn lookup_code(&self, code: u32) -> StoreResult<Vec<IndexRow>> {
        self.with_conn(move |conn, schema| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT code, time, track_id FROM {} WHERE code = ?1 ORDER BY rowid",
                schema.rows
            ))?;
            let rows = stmt
                .query_map([code], |row| {
                    Ok(IndexRow {
                        code: row.get(0)?,
                        time: row.get(1)?,
                        track_id: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.with_conn(|conn, schema| {
            let (rows, tracks, codes): (i64, i64, i64) = conn.query_row(
                &format!(
                    "SELECT COUNT(*), COUNT(DISTINCT track_id), COUNT(DISTINCT code) FROM {}",
                    schema.rows
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(StoreStats {
                total_rows: to_u64("total_rows", rows)?,
                distinct_tracks: to_u64("distinct_tracks", tracks)?,
                distinct_codes: to_u64("distinct_codes", codes)?,
            })
        })
        .await
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{} (table {})", path.display(), self.schema.rows),
            None => format!("sqlite::memory: (table {})", self.schema.rows),
        }
    }
}
