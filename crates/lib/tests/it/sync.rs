//! Sync controller tests: wholesale snapshot replacement, failure
//! isolation, and status reporting.

use std::sync::Arc;

use satchel::FixedClock;
use serde_json::json;

use crate::helpers::{open_carrier, spawn_backend};

#[tokio::test]
async fn download_writes_all_five_pieces() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;

    let report = carrier.sync().download_snapshot().await.unwrap();
    assert_eq!(report.departments, 2);
    assert_eq!(report.courses, 2);
    assert_eq!(report.topics, 2);
    assert_eq!(report.users, 1);
    assert_eq!(report.timestamp, "2026-01-15T10:00:00Z");

    let snapshot = carrier.store().get_all_content().await.unwrap();
    assert_eq!(snapshot.departments.len(), 2);
    assert_eq!(snapshot.courses.len(), 2);
    assert_eq!(snapshot.topics.len(), 2);
    assert_eq!(snapshot.premium_users.len(), 1);
    let info = snapshot.sync_info.expect("sync info present");
    assert_eq!(info.timestamp, "2026-01-15T10:00:00Z");
    assert_eq!(info.total_topics, 2);
}

#[tokio::test]
async fn second_download_leaves_no_stale_survivors() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    carrier.sync().download_snapshot().await.unwrap();

    *backend.state.bulk.lock().unwrap() = json!({
        "departments": [{"id": 1, "name": "Chemistry"}],
        "courses": [],
        "topics": [],
        "premium_users": [],
        "sync_timestamp": "2026-02-01T00:00:00Z",
        "total_topics": 0,
        "total_users": 0,
    });
    carrier.sync().download_snapshot().await.unwrap();

    let snapshot = carrier.store().get_all_content().await.unwrap();
    assert_eq!(snapshot.departments.len(), 1);
    assert_eq!(snapshot.departments[0].name, "Chemistry");
    assert!(snapshot.topics.is_empty());
    assert_eq!(
        snapshot.sync_info.unwrap().timestamp,
        "2026-02-01T00:00:00Z"
    );
}

#[tokio::test]
async fn failed_download_leaves_snapshot_untouched() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    carrier.sync().download_snapshot().await.unwrap();
    let before = carrier.store().get_all_content().await.unwrap();

    *backend.state.bulk_error.lock().unwrap() = Some("export job crashed".to_string());
    let err = carrier.sync().download_snapshot().await.unwrap_err();
    // The backend's reported message is carried through.
    assert!(err.to_string().contains("export job crashed"));

    let after = carrier.store().get_all_content().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn status_reports_counts_and_pending() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;

    let empty = carrier.sync().status().await.unwrap();
    assert!(empty.sync_info.is_none());
    assert_eq!(empty.topics, 0);

    carrier.sync().download_snapshot().await.unwrap();
    carrier
        .queue()
        .enqueue(satchel::queue::NewRegistration {
            name: "Amina".into(),
            code: "REG-1".into(),
            department_id: Some(9),
        })
        .await
        .unwrap();

    let status = carrier.sync().status().await.unwrap();
    assert!(status.sync_info.is_some());
    assert_eq!(status.topics, 2);
    assert_eq!(status.pending_registrations, 1);
}

#[tokio::test]
async fn clear_content_keeps_registrations() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    carrier.sync().download_snapshot().await.unwrap();
    carrier
        .queue()
        .enqueue(satchel::queue::NewRegistration {
            name: "Amina".into(),
            code: "REG-1".into(),
            department_id: None,
        })
        .await
        .unwrap();

    carrier.sync().clear_content().await.unwrap();

    let status = carrier.sync().status().await.unwrap();
    assert!(status.sync_info.is_none());
    assert_eq!(status.topics, 0);
    assert_eq!(status.pending_registrations, 1);
}
