//! Index store trait and backend selection
//!
//! The loader only ever talks to [`IndexStore`]; the concrete engine is picked
//! from the store location given on the command line.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::{IndexRow, IndexStatus, RunInfo, StoreStats};
use crate::postgres::PostgresStore;
use crate::sqlite::SqliteStore;

/// Append-only row table with a secondary index on `code`
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Ensure the schema exists and mark the store as loading.
    async fn begin_run(&self, run: &RunInfo) -> StoreResult<()>;

    /// Append a batch of rows in a single bulk operation.
    async fn insert_batch(&self, rows: Vec<IndexRow>) -> StoreResult<()>;

    /// Create or refresh the index on `code`. Safe to call repeatedly.
    async fn build_index(&self) -> StoreResult<()>;

    /// Current lifecycle state of the index
    async fn status(&self) -> StoreResult<IndexStatus>;

    /// All rows carrying `code`
    async fn lookup_code(&self, code: u32) -> StoreResult<Vec<IndexRow>>;

    /// Row, track and code counts
    async fn stats(&self) -> StoreResult<StoreStats>;

    /// Human-readable location, safe to print
    fn describe(&self) -> String;
}

/// Where the index lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite database file
    Sqlite(PathBuf),
    /// PostgreSQL connection URL
    Postgres(String),
}

impl StoreLocation {
    /// `postgres://` and `postgresql://` URLs select PostgreSQL; anything else
    /// is a SQLite file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("postgres://") || location.starts_with("postgresql://") {
            StoreLocation::Postgres(location.to_string())
        } else {
            StoreLocation::Sqlite(PathBuf::from(location))
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Sqlite(path) => write!(f, "{}", path.display()),
            StoreLocation::Postgres(url) => f.write_str(&redact_url(url)),
        }
    }
}

/// Backend-independent open parameters
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Row table name; the metadata table and index are derived from it
    pub table: String,
    /// PostgreSQL pool size
    pub max_connections: u32,
    /// Create the store if it does not exist
    pub create: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table: "ep_index".to_string(),
            max_connections: 4,
            create: true,
        }
    }
}

/// Open the store at `location`.
pub async fn open_store(
    location: &StoreLocation,
    options: &StoreOptions,
) -> StoreResult<Arc<dyn IndexStore>> {
    match location {
        StoreLocation::Sqlite(path) => {
            let store = if options.create {
                SqliteStore::open(path, &options.table)?
            } else {
                SqliteStore::open_existing(path, &options.table)?
            };
            let store: Arc<dyn IndexStore> = Arc::new(store);
            Ok(store)
        }
        StoreLocation::Postgres(url) => {
            let store = PostgresStore::connect(url, &options.table, options.max_connections).await?;
            let store: Arc<dyn IndexStore> = Arc::new(store);
            Ok(store)
        }
    }
}

/// Hide the password part of a connection URL.
pub(crate) fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let rest = &url[scheme_end..];
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };

    match rest[..at].find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..scheme_end],
            &rest[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
