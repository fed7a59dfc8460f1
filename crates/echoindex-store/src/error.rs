//! Store errors

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an index store. Fatal for the current run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Could not check a connection out of the pool
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Could not build the pool from the connection URL
    #[error("failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// Failed to open the store file
    #[error("failed to open store at '{path}': {reason}")]
    Open { path: PathBuf, reason: String },

    /// The database does not carry the expected tables
    #[error("schema error: {0}")]
    Schema(String),

    /// Table names are interpolated into SQL and must be plain identifiers
    #[error("invalid table name '{0}': use ASCII letters, digits and underscores")]
    InvalidTableName(String),

    /// A stored value does not fit the row model
    #[error("value {value} in column '{column}' is out of range")]
    OutOfRange { column: &'static str, value: i64 },

    /// Another store call panicked while holding the connection
    #[error("store connection lock poisoned")]
    Poisoned,

    /// The blocking task running a store call did not complete
    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
