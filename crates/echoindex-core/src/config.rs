//! Indexer configuration
//!
//! TOML-based configuration for the loader, the record source and the store.
//! Every field has a default so an empty file (or no file) is valid.

use echoindex_store::{validate_table_name, StoreOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexerConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Batching and progress parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Rows buffered before one bulk insert
    #[serde(default = "default_batch_size_rows")]
    pub batch_size_rows: usize,
    /// Emit a progress event every N records (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Drop time offsets and index code presence only
    #[serde(default)]
    pub codes_only: bool,
    /// Count input records first so progress can show a total
    #[serde(default)]
    pub count_first: bool,
    /// Records decoded in parallel before their rows are buffered
    #[serde(default = "default_decode_chunk")]
    pub decode_chunk: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size_rows: default_batch_size_rows(),
            progress_interval: default_progress_interval(),
            codes_only: false,
            count_first: false,
            decode_chunk: default_decode_chunk(),
        }
    }
}

fn default_batch_size_rows() -> usize {
    1_000_000
}
fn default_progress_interval() -> u64 {
    10_000
}
fn default_decode_chunk() -> usize {
    4096
}

/// Where to find the two fields the indexer needs in each JSON line
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_track_id_field")]
    pub track_id_field: String,
    #[serde(default = "default_fingerprint_field")]
    pub fingerprint_field: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            track_id_field: default_track_id_field(),
            fingerprint_field: default_fingerprint_field(),
        }
    }
}

fn default_track_id_field() -> String {
    "meta.track_id".to_string()
}
fn default_fingerprint_field() -> String {
    "track.echoprintstring".to_string()
}

/// Store parameters shared by both backends
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_table() -> String {
    "ep_index".to_string()
}
fn default_max_connections() -> u32 {
    4
}

impl IndexerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: IndexerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.loader.batch_size_rows == 0 {
            anyhow::bail!("batch_size_rows must be > 0");
        }
        if self.loader.decode_chunk == 0 {
            anyhow::bail!("decode_chunk must be > 0");
        }
        for (name, path) in [
            ("track_id_field", &self.source.track_id_field),
            ("fingerprint_field", &self.source.fingerprint_field),
        ] {
            if path.split('.').any(str::is_empty) {
                anyhow::bail!("{} must be a dotted field path, got '{}'", name, path);
            }
        }
        validate_table_name(&self.storage.table)?;
        if self.storage.max_connections == 0 {
            anyhow::bail!("max_connections must be > 0");
        }
        Ok(())
    }

    /// Store open parameters
    pub fn store_options(&self, create: bool) -> StoreOptions {
        StoreOptions {
            table: self.storage.table.clone(),
            max_connections: self.storage.max_connections,
            create,
        }
    }
}
