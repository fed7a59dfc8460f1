//! Row and status models shared by all backends

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One occurrence of a code in a track. Rows are append-only and have no key;
/// duplicates are valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRow {
    pub code: u32,
    /// Absent when the run was loaded in codes-only mode
    pub time: Option<u32>,
    pub track_id: String,
}

impl IndexRow {
    pub fn new(code: u32, time: Option<u32>, track_id: impl Into<String>) -> Self {
        Self {
            code,
            time,
            track_id: track_id.into(),
        }
    }
}

/// Aggregate counts used for verification and the final report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_rows: u64,
    pub distinct_tracks: u64,
    pub distinct_codes: u64,
}

/// Lifecycle of the code index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// No run has started against this store
    Empty,
    /// Rows are being appended; lookups may be incomplete
    Loading,
    /// The code index was built after the last load finished
    Indexed,
}

impl IndexStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexStatus::Empty => "empty",
            IndexStatus::Loading => "loading",
            IndexStatus::Indexed => "indexed",
        }
    }

    /// Parse the persisted status value. Anything unrecognised is treated as
    /// an unfinished load.
    pub fn from_meta(value: Option<&str>) -> Self {
        match value {
            None => IndexStatus::Empty,
            Some("indexed") => IndexStatus::Indexed,
            Some(_) => IndexStatus::Loading,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, IndexStatus::Indexed)
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters recorded when a run starts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    pub codes_only: bool,
    pub inputs: Vec<String>,
}

/// Keys of the per-store metadata table
pub mod keys {
    /// "loading" or "indexed"
    pub const STATUS: &str = "status";

    /// Whether the last run dropped time offsets
    pub const CODES_ONLY: &str = "codes_only";

    /// Input files of the last run, newline separated
    pub const INPUTS: &str = "inputs";

    /// When the last run started (RFC 3339)
    pub const STARTED_AT: &str = "started_at";

    /// When the code index was last built (RFC 3339)
    pub const INDEXED_AT: &str = "indexed_at";

    /// Crate version that wrote the store
    pub const WRITER_VERSION: &str = "writer_version";
}

/// Check that `name` can be spliced into SQL as an identifier.
pub fn validate_table_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= 48
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

/// Widen a stored signed integer back to `u32`.
pub(crate) fn to_u32(column: &'static str, value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}

/// Counts come back as `i64` from both engines.
pub(crate) fn to_u64(column: &'static str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}
