//! Tests for the load pipeline

use super::*;
use crate::progress::NoProgress;
use crate::testing::RecordingStore;
use echoindex_codec::{encode, DecodeErrorKind};
use echoindex_store::{IndexRow, IndexStatus, SqliteStore};
use serde_json::json;
use tempfile::TempDir;

/// Seven payload bytes, zlib-compressed: not a whole number of pairs
const BAD_STRIDE: &str = "eJxjYGRiZmFlAwAAPwAW";
/// Valid base64, not a zlib stream
const NOT_ZLIB: &str = "AAAA";

fn record_line(track_id: &str, encoded: &str) -> String {
    json!({"meta": {"track_id": track_id}, "track": {"echoprintstring": encoded}}).to_string()
}

fn track(track_id: &str, pairs: &[(u32, u32)]) -> String {
    record_line(track_id, &encode(pairs).unwrap())
}

fn write_input(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn config(batch_size_rows: usize) -> IndexerConfig {
    let mut config = IndexerConfig::default();
    config.loader.batch_size_rows = batch_size_rows;
    config.loader.decode_chunk = 2;
    config
}

/// Collects a compact trace of the events it sees
#[derive(Default)]
struct TraceProgress {
    events: Vec<String>,
}

impl Progress for TraceProgress {
    fn report(&mut self, event: &ProgressEvent<'_>) {
        let line = match event {
            ProgressEvent::SourceStarted { total_records, .. } => {
                format!("start {:?}", total_records)
            }
            ProgressEvent::Records { counters, .. } => format!("records {}", counters.records()),
            ProgressEvent::SourceFinished { summary } => {
                format!("finish {}", summary.counters.records())
            }
            ProgressEvent::IndexBuildStarted => "index".to_string(),
            ProgressEvent::IndexBuilt { .. } => "indexed".to_string(),
        };
        self.events.push(line);
    }
}

#[tokio::test]
async fn test_end_to_end_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "tracks.jsonl",
        &[track("A", &[(100, 0), (200, 5)]), track("B", &[(100, 1)])],
    );

    let store = Arc::new(SqliteStore::open_in_memory("ep_index").unwrap());
    let pipeline = Pipeline::new(store.clone(), config(1000));
    let summary = pipeline.run(&[input], &mut NoProgress).await.unwrap();

    assert_eq!(summary.totals.tracks_ok, 2);
    assert_eq!(summary.totals.codes_total, 3);
    assert_eq!(summary.rows_flushed, 3);
    assert_eq!(summary.status, IndexStatus::Indexed);
    assert_eq!(summary.index.total_rows, 3);
    assert_eq!(summary.index.distinct_tracks, 2);
    assert_eq!(summary.index.distinct_codes, 2);

    assert_eq!(
        store.lookup_code(100).await.unwrap(),
        vec![IndexRow::new(100, Some(0), "A"), IndexRow::new(100, Some(1), "B")]
    );
    assert_eq!(
        store.lookup_code(200).await.unwrap(),
        vec![IndexRow::new(200, Some(5), "A")]
    );
    assert!(store.lookup_code(300).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_records_do_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "mixed.jsonl",
        &[
            track("A", &[(1, 0), (2, 1)]),
            record_line("bad-b64", "!!!!"),
            record_line("bad-zlib", NOT_ZLIB),
            record_line("bad-stride", BAD_STRIDE),
            "{not json".to_string(),
            json!({"meta": {"track_id": "no-fp"}}).to_string(),
            track("B", &[(3, 0)]),
        ],
    );

    let store = Arc::new(RecordingStore::new());
    let pipeline = Pipeline::new(store.clone(), config(1000));
    let summary = pipeline.run(&[input], &mut NoProgress).await.unwrap();

    let totals = &summary.totals;
    assert_eq!(totals.tracks_ok, 2);
    assert_eq!(totals.tracks_failed, 3);
    assert_eq!(totals.records_skipped, 2);
    for kind in DecodeErrorKind::ALL {
        assert_eq!(totals.failures_by_kind[&kind], 1, "{}", kind);
    }

    let owners: Vec<String> = store.rows().into_iter().map(|r| r.track_id).collect();
    assert_eq!(owners, vec!["A", "A", "B"]);
    assert_eq!(store.index_builds(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utf8.jsonl");
    let mut bytes = track("A", &[(1, 0), (2, 1)]).into_bytes();
    bytes.extend_from_slice(b"\n\xff\xfe\n");
    bytes.extend_from_slice(track("B", &[(3, 0)]).as_bytes());
    std::fs::write(&path, bytes).unwrap();

    let store = Arc::new(RecordingStore::new());
    let summary = Pipeline::new(store.clone(), config(1000))
        .run(&[path], &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(summary.totals.tracks_ok, 2);
    assert_eq!(summary.totals.records_skipped, 1);
    assert_eq!(summary.totals.tracks_failed, 0);

    let owners: Vec<String> = store.rows().into_iter().map(|r| r.track_id).collect();
    assert_eq!(owners, vec!["A", "A", "B"]);
    assert_eq!(store.index_builds(), 1);
}

#[tokio::test]
async fn test_batches_are_exact_and_index_built_once() {
    let dir = tempfile::tempdir().unwrap();
    // 9 rows with a batch size of 4: two full batches plus the remainder
    let input = write_input(
        &dir,
        "tracks.jsonl",
        &[
            track("A", &[(1, 0), (2, 1), (3, 2)]),
            track("B", &[(4, 0), (5, 1), (6, 2)]),
            track("C", &[(7, 0), (8, 1), (9, 2)]),
        ],
    );

    let store = Arc::new(RecordingStore::new());
    let pipeline = Pipeline::new(store.clone(), config(4));
    let summary = pipeline.run(&[input], &mut NoProgress).await.unwrap();

    assert_eq!(store.batch_sizes(), vec![4, 4, 1]);
    assert_eq!(summary.batches_flushed, 3);
    assert_eq!(summary.tracks_committed, 3);
    assert_eq!(store.index_builds(), 1);
}

#[tokio::test]
async fn test_store_failure_reports_committed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "tracks.jsonl",
        &[
            track("A", &[(1, 0), (2, 1)]),
            track("B", &[(3, 0), (4, 1)]),
            track("C", &[(5, 0)]),
        ],
    );

    let store = Arc::new(RecordingStore::failing_on(2));
    let pipeline = Pipeline::new(store.clone(), config(2));
    let err = pipeline.run(&[input], &mut NoProgress).await.unwrap_err();

    match err {
        PipelineError::Store {
            committed_rows,
            committed_tracks,
            ..
        } => {
            assert_eq!(committed_rows, 2);
            assert_eq!(committed_tracks, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(store.index_builds(), 0);
}

#[tokio::test]
async fn test_codes_only_mode() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "tracks.jsonl", &[track("A", &[(100, 0), (200, 5)])]);

    let store = Arc::new(RecordingStore::new());
    let mut cfg = config(1000);
    cfg.loader.codes_only = true;
    let summary = Pipeline::new(store.clone(), cfg)
        .run(&[input], &mut NoProgress)
        .await
        .unwrap();

    assert!(summary.codes_only);
    assert!(store.runs.lock().unwrap()[0].codes_only);
    assert_eq!(
        store.rows(),
        vec![IndexRow::new(100, None, "A"), IndexRow::new(200, None, "A")]
    );
}

#[tokio::test]
async fn test_multiple_inputs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_input(&dir, "a.jsonl", &[track("A", &[(1, 0)])]);
    let second = write_input(&dir, "b.jsonl", &[track("B", &[(2, 0)]), "".to_string()]);

    let store = Arc::new(RecordingStore::new());
    let summary = Pipeline::new(store.clone(), config(1000))
        .run(&[first.clone(), second], &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(summary.sources.len(), 2);
    assert_eq!(summary.sources[0].path, first.display().to_string());
    assert_eq!(summary.sources[1].counters.tracks_ok, 1);
    // Each source is flushed when it ends
    assert_eq!(store.batch_sizes(), vec![1, 1]);
    assert_eq!(store.runs.lock().unwrap()[0].inputs.len(), 2);
    assert_eq!(store.index_builds(), 1);
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordingStore::new());
    let result = Pipeline::new(store.clone(), config(1000))
        .run(&[dir.path().join("missing.jsonl")], &mut NoProgress)
        .await;

    assert!(matches!(result, Err(PipelineError::Source(_))));
    assert_eq!(store.index_builds(), 0);
}

#[tokio::test]
async fn test_progress_events() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..5)
        .map(|i| track(&format!("T{}", i), &[(i, 0)]))
        .collect();
    let input = write_input(&dir, "tracks.jsonl", &lines);

    let mut cfg = config(1000);
    cfg.loader.progress_interval = 2;
    cfg.loader.count_first = true;

    let mut progress = TraceProgress::default();
    Pipeline::new(Arc::new(RecordingStore::new()), cfg)
        .run(&[input], &mut progress)
        .await
        .unwrap();

    assert_eq!(
        progress.events,
        vec![
            "start Some(5)",
            "records 2",
            "records 4",
            "finish 5",
            "index",
            "indexed"
        ]
    );
}

#[test]
fn test_pipeline_error_message() {
    let err = PipelineError::store(
        StoreError::Task("disk full".to_string()),
        LoaderStats {
            rows_flushed: 10,
            batches_flushed: 1,
            tracks_committed: 3,
        },
    );
    let message = err.to_string();
    assert!(message.contains("10 rows"));
    assert!(message.contains("3 tracks"));
}
