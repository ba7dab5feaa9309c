//! End-to-end: payload -> validator -> buffer -> worker -> SQLite

use event_store::{EventStore, SqliteEventStore};
use ingestion::{BufferConfig, IngestionConfig, IngestionError, IngestionPipeline, WorkerConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

async fn sqlite_store(dir: &TempDir) -> Arc<SqliteEventStore> {
    let mut store = SqliteEventStore::with_default_config(dir.path().join("events.db")).unwrap();
    store.initialize().await.unwrap();
    Arc::new(store)
}

fn config(capacity: usize) -> IngestionConfig {
    IngestionConfig {
        buffer: BufferConfig { capacity, high_watermark: Some(0) },
        worker: WorkerConfig {
            tick_interval_ms: 10,
            batch_size: 100,
            ..WorkerConfig::default()
        },
        ..IngestionConfig::default()
    }
}

#[tokio::test]
async fn test_click_event_reaches_store_after_one_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir).await;
    let pipeline = IngestionPipeline::new(config(1_000)).unwrap();
    let worker = pipeline.worker(store.clone());

    assert_ok!(pipeline.submit(&json!({"site_id": "s1", "event_type": "click"})));
    assert_eq!(pipeline.buffer().len(), 1);

    let report = worker.run_cycle().await;
    assert_eq!(report.persisted, 1);

    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].site_id, "s1");
    assert_eq!(records[0].event_type, "click");
    assert_eq!(records[0].path, "");
    assert!(!records[0].timestamp.is_empty());
}

#[tokio::test]
async fn test_event_missing_type_never_enters_buffer() {
    let pipeline = IngestionPipeline::new(config(1_000)).unwrap();

    let err = pipeline.submit(&json!({"site_id": "s1"})).unwrap_err();
    match err {
        IngestionError::Validation(e) => assert_eq!(e.missing_fields, vec!["event_type"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(pipeline.buffer().len(), 0);
}

#[tokio::test]
async fn test_store_grows_by_drained_count_in_fifo_order() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir).await;
    let pipeline = IngestionPipeline::new(config(1_000)).unwrap();
    let worker = pipeline.worker(store.clone());

    for i in 0..25 {
        pipeline
            .submit(&json!({"site_id": "s1", "event_type": format!("e{i}"), "path": "/docs"}))
            .unwrap();
    }

    let before = store.list_all().await.unwrap().len();
    let report = worker.run_cycle().await;
    let after = store.list_all().await.unwrap();

    assert_eq!(after.len(), before + report.drained);

    let kinds: Vec<String> = after.into_iter().map(|r| r.event_type).collect();
    let expected: Vec<String> = (0..25).map(|i| format!("e{i}")).collect();
    assert_eq!(kinds, expected);
}

#[tokio::test]
async fn test_full_buffer_then_worker_frees_space() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir).await;
    let pipeline = IngestionPipeline::new(config(2)).unwrap();
    let worker = pipeline.worker(store.clone());
    let raw = json!({"site_id": "s1", "event_type": "click"});

    pipeline.submit(&raw).unwrap();
    pipeline.submit(&raw).unwrap();
    assert!(pipeline.submit(&raw).unwrap_err().is_retryable());
    assert_eq!(pipeline.buffer().len(), 2);

    worker.run_cycle().await;
    assert_ok!(pipeline.submit(&raw));
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_running_worker_and_shutdown_flush() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir).await;
    let pipeline = IngestionPipeline::new(config(1_000)).unwrap();
    let handle = Arc::new(pipeline.worker(store.clone())).spawn();

    for i in 0..50 {
        pipeline.submit(&json!({"site_id": "s2", "event_type": "view", "user_id": i})).unwrap();
        if i % 10 == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    let report = handle.shutdown().await.unwrap();
    assert_eq!(report.remaining, 0);

    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 50);
    assert!(records.windows(2).all(|w| w[0].id < w[1].id));
    let users: Vec<String> = records.iter().map(|r| r.user_id.clone()).collect();
    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(users, expected);
    assert_eq!(pipeline.stats().metrics.events_persisted_total, 50);
}
