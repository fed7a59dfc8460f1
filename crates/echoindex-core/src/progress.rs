//! Progress reporting hooks for long-running loads

use std::path::Path;
use std::time::Duration;

use crate::loader::LoaderStats;
use crate::summary::{Counters, SourceSummary};

/// Events emitted by the pipeline while it runs
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    SourceStarted {
        path: &'a Path,
        total_records: Option<u64>,
    },
    /// Emitted every `progress_interval` records
    Records {
        path: &'a Path,
        counters: &'a Counters,
        loader: LoaderStats,
        total_records: Option<u64>,
        elapsed: Duration,
    },
    SourceFinished {
        summary: &'a SourceSummary,
    },
    IndexBuildStarted,
    IndexBuilt {
        elapsed: Duration,
    },
}

pub trait Progress: Send {
    fn report(&mut self, event: &ProgressEvent<'_>);
}

/// Reports progress through the `log` facade
#[derive(Debug, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&mut self, event: &ProgressEvent<'_>) {
        match event {
            ProgressEvent::SourceStarted {
                path,
                total_records,
            } => match total_records {
                Some(total) => log::info!("Loading {} ({} records)", path.display(), total),
                None => log::info!("Loading {}", path.display()),
            },
            ProgressEvent::Records {
                path,
                counters,
                loader,
                total_records,
                elapsed,
            } => {
                let secs = elapsed.as_secs_f64();
                let rate = if secs > 0.0 {
                    counters.records() as f64 / secs
                } else {
                    0.0
                };
                let position = match total_records {
                    Some(total) => format!("{}/{}", counters.records(), total),
                    None => counters.records().to_string(),
                };
                log::info!(
                    "{}: {} records ({:.0}/s), {} ok, {} failed, {} skipped, {} rows committed",
                    path.display(),
                    position,
                    rate,
                    counters.tracks_ok,
                    counters.tracks_failed,
                    counters.records_skipped,
                    loader.rows_flushed
                );
            }
            ProgressEvent::SourceFinished { summary } => {
                log::info!(
                    "Finished {}: {} ok, {} failed, {} skipped, {} codes in {:.1}s",
                    summary.path,
                    summary.counters.tracks_ok,
                    summary.counters.tracks_failed,
                    summary.counters.records_skipped,
                    summary.counters.codes_total,
                    summary.elapsed_secs
                );
            }
            ProgressEvent::IndexBuildStarted => log::info!("Building code index..."),
            ProgressEvent::IndexBuilt { elapsed } => {
                log::info!("Code index built in {:.1}s", elapsed.as_secs_f64())
            }
        }
    }
}

/// Discards all events
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _event: &ProgressEvent<'_>) {}
}
