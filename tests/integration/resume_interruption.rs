//! Integration tests for interruption and restart of resumable runs

use erate_open_data::fetcher::FetchError;
use erate_open_data::output::CsvExporter;
use erate_open_data::resume::{fetch_with_resume, ProgressLedger};
use erate_open_data::Record;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn bens(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{:06}", 100000 + i)).collect()
}

fn summary(ben: &str) -> Record {
    match json!({"ben": ben, "found": true, "frn_count": 1}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Ten items at checkpoint interval 5, killed after the 7th completes:
/// the restart skips the 5 checkpointed items and re-fetches the 2 lost
/// ones, for 12 successful fetches across both runs.
#[tokio::test]
async fn test_interrupted_run_refetches_only_unflushed_items() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    let items = bens(10);

    // First run: the 8th new fetch is "the kill".
    let first_fetches = Arc::new(AtomicUsize::new(0));
    let counter = first_fetches.clone();
    let result = fetch_with_resume(
        &items,
        move |ben| {
            let counter = counter.clone();
            async move {
                if counter.load(Ordering::SeqCst) == 7 {
                    return Err(FetchError::Network("killed".into()));
                }
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(summary(&ben))
            }
        },
        &path,
        5,
        Duration::ZERO,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(first_fetches.load(Ordering::SeqCst), 7);
    // Only the first checkpoint survived the kill
    assert_eq!(ProgressLedger::load(&path).completed_count(), 5);

    // Second run: completes the workload.
    let second_fetches = Arc::new(AtomicUsize::new(0));
    let counter = second_fetches.clone();
    let report = fetch_with_resume(
        &items,
        move |ben| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(summary(&ben))
            }
        },
        &path,
        5,
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(report.skipped, 5);
    assert_eq!(report.fetched, 5);
    assert_eq!(second_fetches.load(Ordering::SeqCst), 5);
    assert_eq!(
        first_fetches.load(Ordering::SeqCst) + second_fetches.load(Ordering::SeqCst),
        12
    );
    assert_eq!(ProgressLedger::load(&path).completed_count(), 10);
}

/// Re-running a fully completed workload performs zero fetches and the
/// ledger-driven export is byte-identical
#[tokio::test]
async fn test_completed_workload_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    let items = bens(6);

    fetch_with_resume(
        &items,
        |ben: String| async move { Ok(summary(&ben)) },
        &path,
        2,
        Duration::ZERO,
    )
    .await
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let report = fetch_with_resume(
        &items,
        move |ben| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(summary(&ben))
            }
        },
        &path,
        2,
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 6);

    // Exporting from the ledger twice produces the same bytes
    let columns = ["ben", "found", "frn_count"];
    for name in ["first.csv", "second.csv"] {
        let ledger = ProgressLedger::load(&path);
        let mut exporter = CsvExporter::create(dir.path().join(name), columns).unwrap();
        for ben in &items {
            if let Some(record) = ledger.get(ben) {
                exporter.write_record(record).unwrap();
            }
        }
        exporter.close().unwrap();
    }
    let first = std::fs::read(dir.path().join("first.csv")).unwrap();
    let second = std::fs::read(dir.path().join("second.csv")).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

/// A ledger from an older or hand-edited run with unknown keys still
/// loads, and unknown keys do not disturb the current workload
#[tokio::test]
async fn test_foreign_ledger_keys_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");

    let mut seeded = ProgressLedger::new();
    seeded.record("999999", summary("999999"));
    seeded.save(&path).unwrap();

    let items = bens(3);
    let report = fetch_with_resume(
        &items,
        |ben: String| async move { Ok(summary(&ben)) },
        &path,
        0,
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.skipped, 0);
    // The foreign key survives alongside the new completions
    assert_eq!(ProgressLedger::load(&path).completed_count(), 4);
}
