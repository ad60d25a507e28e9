use std::sync::atomic::Ordering;

use serde_json::json;

use super::*;
use crate::api::ExecutionSummary;
use crate::backend_fake::FakeBackend;
use crate::doc::ExecutionStatus;

fn record(node_id: &str, status: ExecutionStatus) -> NodeExecutionData {
    NodeExecutionData { node_id: node_id.into(), status, ..Default::default() }
}

fn sync_with(backend: &Arc<FakeBackend>) -> ExecutionSync {
    ExecutionSync::new(Arc::clone(backend) as Arc<dyn WorkflowBackend>, "wf-1")
}

#[tokio::test]
async fn fetch_history_returns_records() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .history
        .lock()
        .unwrap()
        .insert("ex-1".into(), vec![record("a", ExecutionStatus::Completed)]);
    let sync = sync_with(&backend);

    let records = sync.fetch_history("ex-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].node_id, "a");
}

#[tokio::test]
async fn fetch_history_failure_is_none() {
    let backend = Arc::new(FakeBackend::default());
    backend.fail.store(true, Ordering::SeqCst);
    assert!(sync_with(&backend).fetch_history("ex-1").await.is_none());
}

#[tokio::test]
async fn load_latest_uses_embedded_records() {
    let backend = Arc::new(FakeBackend::default());
    *backend.latest.lock().unwrap() = Some(ExecutionSummary {
        id: "ex-9".into(),
        status: ExecutionStatus::Completed,
        nodes: vec![record("a", ExecutionStatus::Completed)],
    });
    let sync = sync_with(&backend);

    let (id, records) = sync.load_latest().await.unwrap();
    assert_eq!(id, "ex-9");
    assert_eq!(records.len(), 1);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn load_latest_fetches_missing_records() {
    let backend = Arc::new(FakeBackend::default());
    *backend.latest.lock().unwrap() =
        Some(ExecutionSummary { id: "ex-9".into(), status: ExecutionStatus::Running, nodes: Vec::new() });
    backend
        .history
        .lock()
        .unwrap()
        .insert("ex-9".into(), vec![record("b", ExecutionStatus::Running)]);
    let sync = sync_with(&backend);

    let (_, records) = sync.load_latest().await.unwrap();
    assert_eq!(records[0].node_id, "b");
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn load_latest_without_execution_is_none() {
    let backend = Arc::new(FakeBackend::default());
    assert!(sync_with(&backend).load_latest().await.is_none());
}

#[tokio::test]
async fn retry_reports_acceptance() {
    let backend = Arc::new(FakeBackend::default());
    let sync = sync_with(&backend);
    assert!(sync.retry("ex-1", "a").await);
    assert_eq!(backend.retries.lock().unwrap().as_slice(), &[("ex-1".to_string(), "a".to_string())]);

    backend.fail.store(true, Ordering::SeqCst);
    assert!(!sync.retry("ex-1", "a").await);
}

#[tokio::test]
async fn trigger_passes_execution_id_through() {
    let backend = Arc::new(FakeBackend::default());
    *backend.started_execution_id.lock().unwrap() = Some("ex-new".into());
    let sync = sync_with(&backend);

    let started = sync.trigger(TriggerKind::Chat, json!({ "message": "hi" })).await;
    assert_eq!(started, Some(Some("ex-new".into())));
    assert_eq!(backend.runs.lock().unwrap()[0].0, TriggerKind::Chat);

    backend.fail.store(true, Ordering::SeqCst);
    assert_eq!(sync.trigger(TriggerKind::Http, json!({})).await, None);
}
