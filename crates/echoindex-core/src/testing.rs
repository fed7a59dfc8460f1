//! In-memory stores for unit tests

use async_trait::async_trait;
use echoindex_store::{IndexRow, IndexStatus, IndexStore, RunInfo, StoreError, StoreResult, StoreStats};
use std::collections::HashSet;
use std::sync::Mutex;

/// Keeps every batch it receives and can fail on a chosen insert call.
#[derive(Default)]
pub struct RecordingStore {
    pub batches: Mutex<Vec<Vec<IndexRow>>>,
    pub runs: Mutex<Vec<RunInfo>>,
    pub index_builds: Mutex<u32>,
    /// 1-based insert call that fails
    fail_on_batch: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(batch: usize) -> Self {
        Self {
            fail_on_batch: Some(batch),
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn rows(&self) -> Vec<IndexRow> {
        self.batches.lock().unwrap().concat()
    }

    pub fn index_builds(&self) -> u32 {
        *self.index_builds.lock().unwrap()
    }
}

#[async_trait]
impl IndexStore for RecordingStore {
    async fn begin_run(&self, run: &RunInfo) -> StoreResult<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn insert_batch(&self, rows: Vec<IndexRow>) -> StoreResult<()> {
        let mut batches = self.batches.lock().unwrap();
        if self.fail_on_batch == Some(batches.len() + 1) {
            return Err(StoreError::Task("simulated write failure".to_string()));
        }
        batches.push(rows);
        Ok(())
    }

    async fn build_index(&self) -> StoreResult<()> {
        *self.index_builds.lock().unwrap() += 1;
        Ok(())
    }

    async fn status(&self) -> StoreResult<IndexStatus> {
        Ok(if self.index_builds() > 0 {
            IndexStatus::Indexed
        } else if self.runs.lock().unwrap().is_empty() {
            IndexStatus::Empty
        } else {
            IndexStatus::Loading
        })
    }

    async fn lookup_code(&self, code: u32) -> StoreResult<Vec<IndexRow>> {
        Ok(self.rows().into_iter().filter(|r| r.code == code).collect())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let rows = self.rows();
        Ok(StoreStats {
            total_rows: rows.len() as u64,
            distinct_tracks: rows.iter().map(|r| &r.track_id).collect::<HashSet<_>>().len() as u64,
            distinct_codes: rows.iter().map(|r| r.code).collect::<HashSet<_>>().len() as u64,
        })
    }

    fn describe(&self) -> String {
        "recording store".to_string()
    }
}
