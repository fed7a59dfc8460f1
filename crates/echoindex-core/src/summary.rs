//! Run counters and summaries

use echoindex_codec::DecodeErrorKind;
use echoindex_store::{IndexStatus, StoreStats};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-record outcome counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Records decoded and buffered
    pub tracks_ok: u64,
    /// Records whose code string failed to decode
    pub tracks_failed: u64,
    /// Rows produced by successful decodes
    pub codes_total: u64,
    /// Lines that were not usable records (bad JSON, missing fields)
    pub records_skipped: u64,
    pub failures_by_kind: BTreeMap<DecodeErrorKind, u64>,
}

impl Counters {
    pub fn record_ok(&mut self, codes: usize) {
        self.tracks_ok += 1;
        self.codes_total += codes as u64;
    }

    pub fn record_failure(&mut self, kind: DecodeErrorKind) {
        self.tracks_failed += 1;
        *self.failures_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn record_skipped(&mut self) {
        self.records_skipped += 1;
    }

    /// Records seen, usable or not
    pub fn records(&self) -> u64 {
        self.tracks_ok + self.tracks_failed + self.records_skipped
    }

    pub fn merge(&mut self, other: &Counters) {
        self.tracks_ok += other.tracks_ok;
        self.tracks_failed += other.tracks_failed;
        self.codes_total += other.codes_total;
        self.records_skipped += other.records_skipped;
        for (kind, count) in &other.failures_by_kind {
            *self.failures_by_kind.entry(*kind).or_insert(0) += count;
        }
    }
}

/// Outcome of loading one input file
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub path: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub elapsed_secs: f64,
}

/// Outcome of a whole indexing run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub store: String,
    pub codes_only: bool,
    pub sources: Vec<SourceSummary>,
    #[serde(flatten)]
    pub totals: Counters,
    pub rows_flushed: u64,
    pub batches_flushed: u64,
    pub tracks_committed: u64,
    pub status: IndexStatus,
    pub index: StoreStats,
    pub index_build_secs: f64,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn tracks_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            (self.totals.tracks_ok + self.totals.tracks_failed) as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}
