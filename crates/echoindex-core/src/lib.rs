//! Echoindex core
//!
//! Streams fingerprint records out of JSON-lines files, decodes their code
//! strings and bulk-loads `(code, time, track_id)` rows into an index store.

pub mod config;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod summary;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{IndexerConfig, LoaderConfig, SourceConfig, StorageConfig};
pub use loader::{BatchLoader, LoaderStats};
pub use pipeline::{Pipeline, PipelineError};
pub use progress::{LogProgress, NoProgress, Progress, ProgressEvent};
pub use source::{count_records, FieldPath, FingerprintRecord, RecordSource, SourceError};
pub use summary::{Counters, RunSummary, SourceSummary};
