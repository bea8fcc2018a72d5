//! Store engine tests: family creation, persistence, atomic snapshot
//! replacement, and corruption recovery.

use satchel::model::{ContentSnapshot, PendingRegistration, Session, SyncInfo};
use satchel::store::StoreEngine;
use serde_json::json;

fn sample_snapshot() -> ContentSnapshot {
    serde_json::from_value(json!({
        "departments": [{"id": 9, "name": "Math"}],
        "courses": [{"id": 2, "name": "Calculus", "year": "2", "departments": [9]}],
        "topics": [{
            "id": 5, "course_id": 2, "title": "X", "page_range": "1-3",
            "raw_text": "body", "refined_summary": null, "is_premium": false,
            "created_at": "", "updated_at": "",
        }],
        "premium_users": [],
        "sync_info": {"timestamp": "2026-01-15T10:00:00Z", "total_topics": 1, "total_users": 0},
    }))
    .expect("sample snapshot")
}

fn registration(name: &str, code: &str) -> PendingRegistration {
    PendingRegistration {
        id: 0,
        name: name.to_string(),
        code: code.to_string(),
        department_id: None,
        synced: false,
        created_at: 1000,
        synced_at: None,
    }
}

#[tokio::test]
async fn open_is_idempotent_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let engine = StoreEngine::open(Some(path.clone())).await.unwrap();
        engine
            .set_setting("auto_delete", json!(true))
            .await
            .unwrap();
    }

    // Second open finds the same data; families are not recreated over it.
    let engine = StoreEngine::open(Some(path.clone())).await.unwrap();
    assert_eq!(
        engine.get_setting("auto_delete").await.unwrap(),
        Some(json!(true))
    );
}

#[tokio::test]
async fn snapshot_replacement_is_wholesale() {
    let engine = StoreEngine::open(None).await.unwrap();

    let first = sample_snapshot();
    engine.replace_content(&first).await.unwrap();
    assert_eq!(engine.get_all_content().await.unwrap(), first);

    // A second snapshot with fewer collections leaves no stale survivors.
    let second: ContentSnapshot = serde_json::from_value(json!({
        "departments": [{"id": 1, "name": "Chemistry"}],
        "courses": [],
        "topics": [],
        "premium_users": [],
        "sync_info": {"timestamp": "2026-02-01T00:00:00Z", "total_topics": 0, "total_users": 0},
    }))
    .unwrap();
    engine.replace_content(&second).await.unwrap();

    let read = engine.get_all_content().await.unwrap();
    assert_eq!(read, second);
    assert!(read.topics.is_empty());
}

#[tokio::test]
async fn missing_sync_info_reads_as_empty() {
    let engine = StoreEngine::open(None).await.unwrap();

    let mut snapshot = sample_snapshot();
    snapshot.sync_info = None;
    engine.replace_content(&snapshot).await.unwrap();

    // Collections are on disk, but without sync_info the snapshot is invalid.
    let read = engine.get_all_content().await.unwrap();
    assert_eq!(read, ContentSnapshot::default());
}

#[tokio::test]
async fn registrations_get_sequential_ids_and_index() {
    let engine = StoreEngine::open(None).await.unwrap();

    let first = engine
        .insert_registration(&registration("Amina", "REG-1"))
        .await
        .unwrap();
    let second = engine
        .insert_registration(&registration("Bakari", "REG-2"))
        .await
        .unwrap();
    assert_eq!((first, second), (1, 2));

    engine.mark_registrations_synced(&[1], 5000).await.unwrap();

    let unsynced = engine.unsynced_registrations().await.unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].id, 2);

    let synced = engine.synced_registrations().await.unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].id, 1);
    assert_eq!(synced[0].synced_at, Some(5000));
}

#[tokio::test]
async fn mark_synced_skips_missing_ids() {
    let engine = StoreEngine::open(None).await.unwrap();
    engine
        .insert_registration(&registration("Amina", "REG-1"))
        .await
        .unwrap();

    // Id 42 never existed; marking must not invent it.
    engine
        .mark_registrations_synced(&[1, 42], 5000)
        .await
        .unwrap();
    assert_eq!(engine.all_registrations().await.unwrap().len(), 1);
    assert!(engine.unsynced_registrations().await.unwrap().is_empty());
}

#[tokio::test]
async fn session_slot_roundtrip() {
    let engine = StoreEngine::open(None).await.unwrap();
    assert!(engine.get_session_record().await.unwrap().is_none());

    let session = Session::starting_at("amina".into(), 7, true, 1000);
    engine.put_session(&session).await.unwrap();
    assert_eq!(engine.get_session_record().await.unwrap(), Some(session));

    engine.clear_session().await.unwrap();
    assert!(engine.get_session_record().await.unwrap().is_none());
}

#[tokio::test]
async fn version_ahead_store_recovers_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    // A previous build left a higher version behind.
    std::fs::write(
        &path,
        serde_json::to_string(&json!({"version": 99, "families": {}})).unwrap(),
    )
    .unwrap();

    let engine = StoreEngine::open(Some(path.clone())).await.unwrap();

    // All four families exist and are empty.
    assert_eq!(
        engine.get_all_content().await.unwrap(),
        ContentSnapshot::default()
    );
    assert!(engine.all_registrations().await.unwrap().is_empty());
    assert!(engine.get_setting("auto_delete").await.unwrap().is_none());
    assert!(engine.get_session_record().await.unwrap().is_none());

    // The recreated store carries the expected version again.
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], json!(1));
}

#[tokio::test]
async fn corrupt_store_file_recovers_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "definitely { not json").unwrap();

    let engine = StoreEngine::open(Some(path.clone())).await.unwrap();
    assert_eq!(
        engine.get_all_content().await.unwrap(),
        ContentSnapshot::default()
    );

    // The engine is usable after recovery.
    let id = engine
        .insert_registration(&registration("Amina", "REG-1"))
        .await
        .unwrap();
    assert_eq!(id, 1);
}

#[tokio::test]
async fn sync_info_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let engine = StoreEngine::open(Some(path.clone())).await.unwrap();
        engine.replace_content(&sample_snapshot()).await.unwrap();
    }

    let engine = StoreEngine::open(Some(path)).await.unwrap();
    let read = engine.get_all_content().await.unwrap();
    assert_eq!(
        read.sync_info,
        Some(SyncInfo {
            timestamp: "2026-01-15T10:00:00Z".into(),
            total_topics: 1,
            total_users: 0,
        })
    );
}
