//! Shared test helpers: a scriptable mock backend server and carrier
//! constructors.
//!
//! The mock backend is an axum router bound to port 0, the same way the
//! real LAN responder runs. Each endpoint's behavior is adjustable through
//! `MockState`, and upload calls can be gated so a test can interleave work
//! while an upload is in flight.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::sync::{Notify, oneshot};
use url::Url;

use satchel::{Carrier, CarrierConfig, FixedClock, VerifyFallback};

/// Scriptable behavior for the mock backend.
pub struct MockState {
    pub login_success: AtomicBool,
    pub me_authenticated: AtomicBool,
    pub me_unauthorized: AtomicBool,
    pub bulk: Mutex<Value>,
    pub bulk_error: Mutex<Option<String>>,
    pub bulk_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub uploads: Mutex<Vec<Value>>,
    pub gate_uploads: AtomicBool,
    pub upload_started: Notify,
    pub upload_release: Notify,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            login_success: AtomicBool::new(true),
            me_authenticated: AtomicBool::new(true),
            me_unauthorized: AtomicBool::new(false),
            bulk: Mutex::new(sample_bulk()),
            bulk_error: Mutex::new(None),
            bulk_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            gate_uploads: AtomicBool::new(false),
            upload_started: Notify::new(),
            upload_release: Notify::new(),
        }
    }
}

/// A running mock backend. Dropping it shuts the server down.
pub struct TestBackend {
    pub addr: SocketAddr,
    pub url: Url,
    pub state: Arc<MockState>,
    _shutdown: oneshot::Sender<()>,
}

/// Spawn a mock backend on an ephemeral port.
pub async fn spawn_backend() -> TestBackend {
    let state = Arc::new(MockState::default());
    let router = Router::new()
        .route("/auth/login/", post(mock_login))
        .route("/auth/logout/", post(mock_logout))
        .route("/auth/me/", get(mock_me))
        .route("/api/admin/bulk-download/", get(mock_bulk_download))
        .route("/admin/upload-users/", post(mock_upload_users))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    let url = Url::parse(&format!("http://{addr}/")).expect("mock backend URL");
    TestBackend {
        addr,
        url,
        state,
        _shutdown: shutdown_tx,
    }
}

async fn mock_login(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Response {
    if state.login_success.load(Ordering::SeqCst) {
        Json(json!({
            "success": true,
            "username": "amina",
            "user_id": 7,
            "is_admin": true,
        }))
        .into_response()
    } else {
        Json(json!({
            "success": false,
            "error": "invalid username or password",
        }))
        .into_response()
    }
}

async fn mock_logout() -> Response {
    Json(json!({})).into_response()
}

async fn mock_me(State(state): State<Arc<MockState>>) -> Response {
    if state.me_unauthorized.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
            .into_response();
    }
    Json(json!({
        "authenticated": state.me_authenticated.load(Ordering::SeqCst),
        "username": "amina",
        "user_id": 7,
        "is_admin": true,
    }))
    .into_response()
}

async fn mock_bulk_download(State(state): State<Arc<MockState>>) -> Response {
    state.bulk_calls.fetch_add(1, Ordering::SeqCst);
    let error = state.bulk_error.lock().unwrap().clone();
    if let Some(message) = error {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": message})),
        )
            .into_response();
    }
    let bulk = state.bulk.lock().unwrap().clone();
    Json(bulk).into_response()
}

async fn mock_upload_users(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    let count = body
        .get("users")
        .and_then(|u| u.as_array())
        .map_or(0, |u| u.len());
    state.uploads.lock().unwrap().push(body);

    if state.gate_uploads.load(Ordering::SeqCst) {
        state.upload_started.notify_one();
        state.upload_release.notified().await;
    }

    Json(json!({
        "success": true,
        "created": count,
        "duplicates": 0,
        "errors": [],
    }))
    .into_response()
}

/// Backend payload matching the topic-join scenario: topic 5 in course 2,
/// course 2 in department 9 ("Math").
pub fn sample_bulk() -> Value {
    json!({
        "departments": [
            {"id": 9, "name": "Math"},
            {"id": 10, "name": "Physics"},
        ],
        "courses": [
            {"id": 2, "name": "Calculus", "year": "2", "departments": [9]},
            {"id": 3, "name": "Mechanics", "year": "1", "departments": [10]},
        ],
        "topics": [
            {
                "id": 5,
                "course_id": 2,
                "title": "X",
                "page_range": "12-40",
                "raw_text": "limits and continuity, at length",
                "refined_summary": "limits, briefly",
                "is_premium": false,
                "created_at": "2026-01-10T08:00:00Z",
                "updated_at": "2026-01-14T08:00:00Z",
            },
            {
                "id": 6,
                "course_id": 3,
                "title": "Y",
                "page_range": "1-9",
                "raw_text": "statics",
                "refined_summary": null,
                "is_premium": true,
                "created_at": "2026-01-10T08:00:00Z",
                "updated_at": "2026-01-11T08:00:00Z",
            },
        ],
        "premium_users": [
            {"id": 1, "name": "Premium One", "code": "PRM-1"},
        ],
        "sync_timestamp": "2026-01-15T10:00:00Z",
        "total_topics": 2,
        "total_users": 1,
    })
}

/// A base URL nothing listens on; connections are refused immediately.
pub fn unreachable_url() -> Url {
    Url::parse("http://127.0.0.1:9/").expect("unreachable URL")
}

pub fn test_config(backend_url: Url) -> CarrierConfig {
    CarrierConfig {
        backend_url,
        request_timeout_secs: 5,
        store_path: None,
        verify_fallback: VerifyFallback::AssumeInvalid,
    }
}

/// Carrier over an ephemeral store, talking to the given backend.
pub async fn open_carrier(backend: &TestBackend, clock: Arc<FixedClock>) -> Carrier {
    Carrier::open_with_clock(test_config(backend.url.clone()), clock)
        .await
        .expect("open carrier")
}

/// Carrier with full control over config.
pub async fn open_carrier_with(
    backend_url: Url,
    store_path: Option<PathBuf>,
    verify_fallback: VerifyFallback,
    clock: Arc<FixedClock>,
) -> Carrier {
    let config = CarrierConfig {
        backend_url,
        request_timeout_secs: 5,
        store_path,
        verify_fallback,
    };
    Carrier::open_with_clock(config, clock).await.expect("open carrier")
}
