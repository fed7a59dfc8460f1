//! End-to-end load: JSON-lines sources → decode → batched inserts → index build

use echoindex_codec::{decode, DecodeMode};
use echoindex_store::{IndexStore, RunInfo, StoreError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::config::IndexerConfig;
use crate::loader::{BatchLoader, LoaderStats};
use crate::progress::{Progress, ProgressEvent};
use crate::source::{count_records, FingerprintRecord, RecordSource, SourceError};
use crate::summary::{Counters, RunSummary, SourceSummary};

#[cfg(test)]
mod tests;

/// Errors that abort a run. Per-record problems never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(
        "store error after {committed_rows} rows from {committed_tracks} tracks were committed: {source}"
    )]
    Store {
        #[source]
        source: StoreError,
        committed_rows: u64,
        committed_tracks: u64,
    },
}

impl PipelineError {
    fn store(source: StoreError, committed: LoaderStats) -> Self {
        PipelineError::Store {
            source,
            committed_rows: committed.rows_flushed,
            committed_tracks: committed.tracks_committed,
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn IndexStore>,
    config: IndexerConfig,
}

impl Pipeline {
    pub fn new(store: Arc<dyn IndexStore>, config: IndexerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Load every input in order, then build the code index once.
    pub async fn run(
        &self,
        inputs: &[PathBuf],
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let codes_only = self.config.loader.codes_only;

        let run = RunInfo {
            codes_only,
            inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
        };
        self.store
            .begin_run(&run)
            .await
            .map_err(|source| PipelineError::store(source, LoaderStats::default()))?;

        log::info!(
            "Loading {} input(s) into {} (batch size {}, codes only: {})",
            inputs.len(),
            self.store.describe(),
            self.config.loader.batch_size_rows,
            codes_only
        );

        let mut loader = BatchLoader::new(self.store.as_ref(), self.config.loader.batch_size_rows);
        let mut totals = Counters::default();
        let mut sources = Vec::with_capacity(inputs.len());

        for path in inputs {
            let total_records = if self.config.loader.count_first {
                Some(count_records(path)?)
            } else {
                None
            };
            let records = RecordSource::open(path, &self.config.source)?;

            let summary = self
                .load_source(path, records, total_records, &mut loader, progress)
                .await?;
            progress.report(&ProgressEvent::SourceFinished { summary: &summary });

            totals.merge(&summary.counters);
            sources.push(summary);
        }

        let committed = loader.stats();
        let loaded = loader
            .finish()
            .await
            .map_err(|source| PipelineError::store(source, committed))?;

        progress.report(&ProgressEvent::IndexBuildStarted);
        let index_started = Instant::now();
        self.store
            .build_index()
            .await
            .map_err(|source| PipelineError::store(source, loaded))?;
        let index_build = index_started.elapsed();
        progress.report(&ProgressEvent::IndexBuilt {
            elapsed: index_build,
        });

        let status = self
            .store
            .status()
            .await
            .map_err(|source| PipelineError::store(source, loaded))?;
        let index = self
            .store
            .stats()
            .await
            .map_err(|source| PipelineError::store(source, loaded))?;

        Ok(RunSummary {
            store: self.store.describe(),
            codes_only,
            sources,
            totals,
            rows_flushed: loaded.rows_flushed,
            batches_flushed: loaded.batches_flushed,
            tracks_committed: loaded.tracks_committed,
            status,
            index,
            index_build_secs: index_build.as_secs_f64(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Decode records chunk by chunk (in parallel within a chunk) and feed
    /// them to the loader in input order. Buffered rows are flushed at the end
    /// of the source.
    async fn load_source<I>(
        &self,
        path: &Path,
        records: I,
        total_records: Option<u64>,
        loader: &mut BatchLoader<'_>,
        progress: &mut dyn Progress,
    ) -> Result<SourceSummary, PipelineError>
    where
        I: Iterator<Item = Result<FingerprintRecord, SourceError>>,
    {
        let started = Instant::now();
        let mode = DecodeMode::from_codes_only(self.config.loader.codes_only);
        let chunk_size = self.config.loader.decode_chunk.max(1);
        let interval = self.config.loader.progress_interval;
        let mut counters = Counters::default();
        let mut records = records.fuse();

        progress.report(&ProgressEvent::SourceStarted {
            path,
            total_records,
        });

        loop {
            let chunk: Vec<_> = records.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let exhausted = chunk.len() < chunk_size;

            let decoded: Vec<_> = chunk
                .into_par_iter()
                .map(|item| {
                    item.map(|record| {
                        let result = decode(&record.encoded, mode);
                        (record, result)
                    })
                })
                .collect();

            for item in decoded {
                match item {
                    Ok((record, Ok(entries))) => {
                        loader
                            .push_track(&record.track_id, &entries)
                            .await
                            .map_err(|source| PipelineError::store(source, loader.stats()))?;
                        counters.record_ok(entries.len());
                    }
                    Ok((record, Err(err))) => {
                        log::warn!(
                            "Track {}: {} error: {}",
                            record.track_id,
                            err.kind(),
                            err
                        );
                        counters.record_failure(err.kind());
                    }
                    Err(err) if err.is_fatal() => return Err(err.into()),
                    Err(err) => {
                        log::warn!("{}: skipping record: {}", path.display(), err);
                        counters.record_skipped();
                    }
                }

                if interval > 0 && counters.records() % interval == 0 {
                    progress.report(&ProgressEvent::Records {
                        path,
                        counters: &counters,
                        loader: loader.stats(),
                        total_records,
                        elapsed: started.elapsed(),
                    });
                }
            }

            if exhausted {
                break;
            }
        }

        loader
            .flush()
            .await
            .map_err(|source| PipelineError::store(source, loader.stats()))?;

        Ok(SourceSummary {
            path: path.display().to_string(),
            counters,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }
}
