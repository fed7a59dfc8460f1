//! SQL operations against the PostgreSQL code index
//!
//! `u32` values are stored as `BIGINT` since PostgreSQL has no unsigned type.

use deadpool_postgres::Pool;

use crate::error::StoreResult;
use crate::models::{to_u32, to_u64, IndexRow, StoreStats};

/// Table and index names derived from one validated base name
#[derive(Debug, Clone)]
pub struct Tables {
    pub rows: String,
    pub meta: String,
    pub code_index: String,
}

impl Tables {
    pub fn new(table: &str) -> Self {
        Self {
            rows: table.to_string(),
            meta: format!("{}_meta", table),
            code_index: format!("{}_code", table),
        }
    }
}

/// Create row and metadata tables if missing
pub async fn ensure_schema(pool: &Pool, tables: &Tables) -> StoreResult<()> {
    let client = pool.get().await?;

    client
        .batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {rows} (
                 code BIGINT NOT NULL,
                 time BIGINT,
                 track_id TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS {meta} (
                 key TEXT PRIMARY KEY,
                 value TEXT
             );",
            rows = tables.rows,
            meta = tables.meta,
        ))
        .await?;

    Ok(())
}

/// Bulk insert one batch as column arrays
pub async fn insert_rows_batch(pool: &Pool, tables: &Tables, rows: &[IndexRow]) -> StoreResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut codes = Vec::with_capacity(rows.len());
    let mut times = Vec::with_capacity(rows.len());
    let mut track_ids = Vec::with_capacity(rows.len());
    for row in rows {
        codes.push(i64::from(row.code));
        times.push(row.time.map(i64::from));
        track_ids.push(row.track_id.as_str());
    }

    let client = pool.get().await?;
    let inserted = client
        .execute(
            &format!(
                "INSERT INTO {} (code, time, track_id)
                 SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TEXT[])",
                tables.rows
            ),
            &[&codes, &times, &track_ids],
        )
        .await?;

    Ok(inserted)
}

/// Create the index on `code` and refresh planner statistics
pub async fn create_code_index(pool: &Pool, tables: &Tables) -> StoreResult<()> {
    let client = pool.get().await?;

    client
        .batch_execute(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {rows} (code);
             ANALYZE {rows};",
            index = tables.code_index,
            rows = tables.rows,
        ))
        .await?;

    Ok(())
}

/// Whether the code index exists
pub async fn has_code_index(pool: &Pool, tables: &Tables) -> StoreResult<bool> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "SELECT EXISTS (
                 SELECT 1 FROM pg_indexes
                 WHERE schemaname = current_schema() AND indexname = $1
             )",
            &[&tables.code_index],
        )
        .await?;

    Ok(row.get(0))
}

/// Get rows by code (uses the code index once built)
pub async fn get_rows_by_code(pool: &Pool, tables: &Tables, code: u32) -> StoreResult<Vec<IndexRow>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            &format!(
                "SELECT code, time, track_id FROM {} WHERE code = $1",
                tables.rows
            ),
            &[&i64::from(code)],
        )
        .await?;

    rows.iter()
        .map(|r| {
            Ok(IndexRow {
                code: to_u32("code", r.get(0))?,
                time: r
                    .get::<_, Option<i64>>(1)
                    .map(|t| to_u32("time", t))
                    .transpose()?,
                track_id: r.get(2),
            })
        })
        .collect()
}

/// Row, track and code counts
pub async fn get_stats(pool: &Pool, tables: &Tables) -> StoreResult<StoreStats> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            &format!(
                "SELECT COUNT(*), COUNT(DISTINCT track_id), COUNT(DISTINCT code) FROM {}",
                tables.rows
            ),
            &[],
        )
        .await?;

    Ok(StoreStats {
        total_rows: to_u64("total_rows", row.get(0))?,
        distinct_tracks: to_u64("distinct_tracks", row.get(1))?,
        distinct_codes: to_u64("distinct_codes", row.get(2))?,
    })
}

/// Store run metadata
pub async fn set_meta(pool: &Pool, tables: &Tables, key: &str, value: &str) -> StoreResult<()> {
    let client = pool.get().await?;

    client
        .execute(
            &format!(
                "INSERT INTO {} (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
                tables.meta
            ),
            &[&key, &value],
        )
        .await?;

    Ok(())
}

/// Get run metadata
pub async fn get_meta(pool: &Pool, tables: &Tables, key: &str) -> StoreResult<Option<String>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            &format!("SELECT value FROM {} WHERE key = $1", tables.meta),
            &[&key],
        )
        .await?;

    Ok(row.and_then(|r| r.get(0)))
}
