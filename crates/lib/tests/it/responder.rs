//! LAN responder tests, driven over real HTTP against an ephemeral port.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use satchel::{Carrier, FixedClock};
use serde_json::Value;

use crate::helpers::{TestBackend, open_carrier, spawn_backend};

/// Carrier with the sample snapshot downloaded and a running responder.
async fn serving_carrier() -> (TestBackend, Carrier, satchel::responder::LanResponder, String) {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    carrier.sync().download_snapshot().await.unwrap();
    let responder = carrier.responder();
    let addr = responder.start("127.0.0.1:0").await.unwrap();
    (backend, carrier, responder, format!("http://{addr}"))
}

async fn get_json(base: &str, path: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(format!("{base}{path}")).await.unwrap();
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_last_sync() {
    let (_backend, _carrier, _responder, base) = serving_carrier().await;

    let (status, body) = get_json(&base, "/health").await;
    assert!(status.is_success());
    assert_eq!(body["serving_offline"], Value::Bool(true));
    assert_eq!(body["online"], Value::Bool(true));
    assert_eq!(body["last_sync"], "2026-01-15T10:00:00Z");
}

#[tokio::test]
async fn health_without_snapshot_has_null_last_sync() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    let responder = carrier.responder();
    let addr = responder.start("127.0.0.1:0").await.unwrap();

    let (status, body) = get_json(&format!("http://{addr}"), "/health").await;
    assert!(status.is_success());
    assert_eq!(body["last_sync"], Value::Null);
}

#[tokio::test]
async fn departments_and_course_filter() {
    let (_backend, _carrier, _responder, base) = serving_carrier().await;

    let (status, body) = get_json(&base, "/departments/").await;
    assert!(status.is_success());
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Only course 2 belongs to department 9.
    let (status, body) = get_json(&base, "/departments/9/courses/").await;
    assert!(status.is_success());
    let courses = body.as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["id"], 2);

    let (_, body) = get_json(&base, "/departments/404/courses/").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn topic_listing_is_metadata_only() {
    let (_backend, _carrier, _responder, base) = serving_carrier().await;

    let (status, body) = get_json(&base, "/courses/2/topics/").await;
    assert!(status.is_success());
    let topics = body.as_array().unwrap();
    assert_eq!(topics.len(), 1);

    let summary = &topics[0];
    assert_eq!(summary["id"], 5);
    assert_eq!(summary["title"], "X");
    assert_eq!(summary["is_refined"], Value::Bool(true));
    assert_eq!(summary["is_premium"], Value::Bool(false));
    // Body text is withheld from listings.
    assert!(summary.get("raw_text").is_none());
    assert!(summary.get("refined_summary").is_none());
}

#[tokio::test]
async fn topic_detail_joins_course_and_departments() {
    let (_backend, _carrier, _responder, base) = serving_carrier().await;

    let (status, body) = get_json(&base, "/topics/5/").await;
    assert!(status.is_success());
    assert_eq!(body["title"], "X");
    assert_eq!(body["course_name"], "Calculus");
    assert_eq!(body["course_year"], "2");
    assert_eq!(body["departments"], serde_json::json!(["Math"]));
    assert_eq!(body["raw_text"], "limits and continuity, at length");
}

#[tokio::test]
async fn unknown_topic_and_unmatched_paths_are_404() {
    let (_backend, _carrier, _responder, base) = serving_carrier().await;

    let (status, _) = get_json(&base, "/topics/999/").await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

    let (status, _) = get_json(&base, "/nope").await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responder_never_calls_the_remote_backend() {
    let (backend, _carrier, _responder, base) = serving_carrier().await;
    let bulk_calls_before = backend.state.bulk_calls.load(Ordering::SeqCst);

    for path in ["/health", "/departments/", "/courses/2/topics/", "/topics/5/"] {
        let (status, _) = get_json(&base, path).await;
        assert!(status.is_success());
    }

    assert_eq!(
        backend.state.bulk_calls.load(Ordering::SeqCst),
        bulk_calls_before
    );
}

#[tokio::test]
async fn server_lifecycle() {
    let backend = spawn_backend().await;
    let carrier = open_carrier(&backend, Arc::new(FixedClock::default())).await;
    let responder = carrier.responder();

    assert!(!responder.is_running());
    let addr = responder.start("127.0.0.1:0").await.unwrap();
    assert!(responder.is_running());
    assert_eq!(responder.address(), Some(addr));

    // A second start is refused while running.
    let err = responder.start("127.0.0.1:0").await.unwrap_err();
    assert!(matches!(
        err,
        satchel::Error::Responder(satchel::responder::ResponderError::ServerAlreadyRunning { .. })
    ));

    responder.stop().await.unwrap();
    assert!(!responder.is_running());
    let err = responder.stop().await.unwrap_err();
    assert!(matches!(
        err,
        satchel::Error::Responder(satchel::responder::ResponderError::ServerNotRunning)
    ));
}
