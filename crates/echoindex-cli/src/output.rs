//! Console and JSON output formatting

use echoindex_core::RunSummary;
use echoindex_store::{IndexRow, IndexStatus, StoreStats};
use serde::Serialize;

/// Rows found for one queried code
#[derive(Debug, Serialize)]
pub struct LookupResult {
    pub code: u32,
    pub hits: usize,
    pub rows: Vec<IndexRow>,
}

impl LookupResult {
    pub fn new(code: u32, rows: Vec<IndexRow>) -> Self {
        Self {
            code,
            hits: rows.len(),
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupOutput {
    pub store: String,
    pub status: IndexStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StoreStats>,
    pub results: Vec<LookupResult>,
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

/// Log a human-readable run summary
pub fn print_run_summary(summary: &RunSummary) {
    let totals = &summary.totals;

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📈 Index Summary ({})", summary.store);
    for source in &summary.sources {
        log::info!(
            "   {}: {} ok, {} failed, {} skipped",
            source.path,
            source.counters.tracks_ok,
            source.counters.tracks_failed,
            source.counters.records_skipped
        );
    }
    log::info!("   ✅ Tracks ok:      {}", totals.tracks_ok);
    log::info!("   ❌ Tracks failed:  {}", totals.tracks_failed);
    for (kind, count) in &totals.failures_by_kind {
        log::info!("        {:<10} {}", kind, count);
    }
    log::info!("   ⏭️  Skipped lines:  {}", totals.records_skipped);
    log::info!("   Codes decoded:    {}", totals.codes_total);
    log::info!(
        "   Rows written:     {} in {} batches",
        summary.rows_flushed,
        summary.batches_flushed
    );
    log::info!(
        "   Index:            {} ({} rows, {} tracks, {} distinct codes)",
        summary.status,
        summary.index.total_rows,
        summary.index.distinct_tracks,
        summary.index.distinct_codes
    );
    log::info!(
        "   Elapsed:          {:.1}s ({:.0} tracks/s, index build {:.1}s)",
        summary.elapsed_secs,
        summary.tracks_per_sec(),
        summary.index_build_secs
    );
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Print lookup results as plain text on stdout
pub fn print_lookup_text(output: &LookupOutput) {
    if let Some(stats) = &output.stats {
        println!(
            "{}: {} rows, {} tracks, {} distinct codes ({})",
            output.store, stats.total_rows, stats.distinct_tracks, stats.distinct_codes, output.status
        );
    }

    for result in &output.results {
        println!("code {}: {} hit(s)", result.code, result.hits);
        for row in &result.rows {
            match row.time {
                Some(time) => println!("  {}\t{}", row.track_id, time),
                None => println!("  {}", row.track_id),
            }
        }
    }
}
