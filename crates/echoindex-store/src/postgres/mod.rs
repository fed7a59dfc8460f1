//! PostgreSQL-backed index store

pub mod connection;
pub mod operations;

use async_trait::async_trait;

use crate::backend::{redact_url, IndexStore};
use crate::error::StoreResult;
use crate::models::{keys, validate_table_name, IndexRow, IndexStatus, RunInfo, StoreStats};
pub use connection::{create_pool, test_connection, DbPool};
use operations::Tables;

pub struct PostgresStore {
    pool: DbPool,
    tables: Tables,
    url: String,
}

impl PostgresStore {
    /// Connect, check the connection and create the schema if needed.
    pub async fn connect(url: &str, table: &str, max_connections: u32) -> StoreResult<Self> {
        validate_table_name(table)?;

        let pool = create_pool(url, max_connections)?;
        test_connection(&pool).await?;

        let tables = Tables::new(table);
        operations::ensure_schema(&pool, &tables).await?;

        Ok(Self {
            pool,
            tables,
            url: redact_url(url),
        })
    }
}

#[async_trait]
impl IndexStore for PostgresStore {
    async fn begin_run(&self, run: &RunInfo) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let entries = [
            (keys::STATUS, IndexStatus::Loading.as_str().to_string()),
            (keys::CODES_ONLY, run.codes_only.to_string()),
            (keys::INPUTS, run.inputs.join("\n")),
            (keys::STARTED_AT, now),
            (keys::WRITER_VERSION, env!("CARGO_PKG_VERSION").to_string()),
        ];

        for (key, value) in &entries {
            operations::set_meta(&self.pool, &self.tables, key, value).await?;
        }
        Ok(())
    }

    async fn insert_batch(&self, rows: Vec<IndexRow>) -> StoreResult<()> {
        let inserted = operations::insert_rows_batch(&self.pool, &self.tables, &rows).await?;
        log::debug!("postgresql: inserted {} rows", inserted);
        Ok(())
    }

    async fn build_index(&self) -> StoreResult<()> {
        operations::create_code_index(&self.pool, &self.tables).await?;
        operations::set_meta(
            &self.pool,
            &self.tables,
            keys::STATUS,
            IndexStatus::Indexed.as_str(),
        )
        .await?;
        operations::set_meta(
            &self.pool,
            &self.tables,
            keys::INDEXED_AT,
            &chrono::Utc::now().to_rfc3339(),
        )
        .await?;
        Ok(())
    }

    async fn status(&self) -> StoreResult<IndexStatus> {
        let value = operations::get_meta(&self.pool, &self.tables, keys::STATUS).await?;
        let status = IndexStatus::from_meta(value.as_deref());

        if status.is_complete() && !operations::has_code_index(&self.pool, &self.tables).await? {
            return Ok(IndexStatus::Loading);
        }
        Ok(status)
    }

    async fn lookup_code(&self, code: u32) -> StoreResult<Vec<IndexRow>> {
        operations::get_rows_by_code(&self.pool, &self.tables, code).await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        operations::get_stats(&self.pool, &self.tables).await
    }

    fn describe(&self) -> String {
        format!("{} (table {})", self.url, self.tables.rows)
    }
}
