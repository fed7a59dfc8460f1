//! Echoindex storage layer
//!
//! Append-only `(code, time, track_id)` row tables with a secondary index on
//! `code`, backed by SQLite or PostgreSQL.

pub mod backend;
pub mod error;
pub mod models;
pub mod postgres;
pub mod sqlite;

// Re-export commonly used types
pub use backend::{open_store, IndexStore, StoreLocation, StoreOptions};
pub use error::{StoreError, StoreResult};
pub use models::{validate_table_name, IndexRow, IndexStatus, RunInfo, StoreStats};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
