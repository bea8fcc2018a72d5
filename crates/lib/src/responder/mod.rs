//! Local LAN responder.
//!
//! A read-only, path-routed axum server answering content queries from peer
//! devices using only the local snapshot. It never mutates cached state and
//! never calls the remote backend, even when outbound connectivity happens
//! to exist, so offline behavior stays deterministic regardless of what the
//! uplink is doing at the moment of a request.

pub mod errors;

pub use errors::ResponderError;

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::{
    Result,
    model::{Course, Department, TopicDetail, TopicSummary},
    store::StoreEngine,
};

/// Payload for the `/health` route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthInfo {
    pub serving_offline: bool,
    pub online: bool,
    pub last_sync: Option<String>,
}

struct RunningServer {
    address: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

/// Serves cached content to peer devices over the ad-hoc network.
pub struct LanResponder {
    store: Arc<StoreEngine>,
    state: Mutex<Option<RunningServer>>,
}

impl LanResponder {
    pub(crate) fn new(store: Arc<StoreEngine>) -> Self {
        Self {
            store,
            state: Mutex::new(None),
        }
    }

    /// The route table, exposed so tests can drive handlers without binding
    /// a socket. Unmatched paths fall through to 404.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/departments/", get(departments))
            .route("/departments/{id}/courses/", get(department_courses))
            .route("/courses/{id}/topics/", get(course_topics))
            .route("/topics/{id}/", get(topic_detail))
            .with_state(Arc::clone(&self.store))
    }

    /// Start serving on the given address. Binding to port 0 is supported;
    /// the actual bound address is returned.
    pub async fn start(&self, addr: &str) -> Result<SocketAddr> {
        if let Some(running) = self.state.lock().unwrap().as_ref() {
            return Err(ResponderError::ServerAlreadyRunning {
                address: running.address.to_string(),
            }
            .into());
        }

        let socket_addr: SocketAddr = addr.parse().map_err(|e| ResponderError::Bind {
            address: addr.to_string(),
            reason: format!("invalid address: {e}"),
        })?;
        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ResponderError::Bind {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        let address = listener.local_addr().map_err(|e| ResponderError::Bind {
            address: addr.to_string(),
            reason: format!("failed to read bound address: {e}"),
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let router = self.router();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "LAN responder server failed");
            }
        });

        *self.state.lock().unwrap() = Some(RunningServer {
            address,
            shutdown: shutdown_tx,
        });
        info!(address = %address, "LAN responder serving");
        Ok(address)
    }

    /// Stop the server, if running.
    pub async fn stop(&self) -> Result<()> {
        let running = self
            .state
            .lock()
            .unwrap()
            .take()
            .ok_or(ResponderError::ServerNotRunning)?;
        let _ = running.shutdown.send(());
        info!(address = %running.address, "LAN responder stopped");
        Ok(())
    }

    /// Whether the server is currently running.
    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }

    /// The bound address, when running.
    pub fn address(&self) -> Option<SocketAddr> {
        self.state.lock().unwrap().as_ref().map(|r| r.address)
    }
}

/// Map a store failure to a 500; the responder has no remote fallback.
fn store_failure(e: crate::Error) -> StatusCode {
    error!(error = %e, "responder failed to read snapshot");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn health(
    State(store): State<Arc<StoreEngine>>,
) -> std::result::Result<Json<HealthInfo>, StatusCode> {
    let snapshot = store.get_all_content().await.map_err(store_failure)?;
    Ok(Json(HealthInfo {
        serving_offline: true,
        online: true,
        last_sync: snapshot.sync_info.map(|info| info.timestamp),
    }))
}

async fn departments(
    State(store): State<Arc<StoreEngine>>,
) -> std::result::Result<Json<Vec<Department>>, StatusCode> {
    let snapshot = store.get_all_content().await.map_err(store_failure)?;
    Ok(Json(snapshot.departments))
}

async fn department_courses(
    State(store): State<Arc<StoreEngine>>,
    Path(id): Path<u64>,
) -> std::result::Result<Json<Vec<Course>>, StatusCode> {
    let snapshot = store.get_all_content().await.map_err(store_failure)?;
    let courses = snapshot
        .courses
        .into_iter()
        .filter(|c| c.departments.contains(&id))
        .collect();
    Ok(Json(courses))
}

async fn course_topics(
    State(store): State<Arc<StoreEngine>>,
    Path(id): Path<u64>,
) -> std::result::Result<Json<Vec<TopicSummary>>, StatusCode> {
    let snapshot = store.get_all_content().await.map_err(store_failure)?;
    let topics = snapshot
        .topics
        .iter()
        .filter(|t| t.course_id == id)
        .map(TopicSummary::from)
        .collect();
    Ok(Json(topics))
}

async fn topic_detail(
    State(store): State<Arc<StoreEngine>>,
    Path(id): Path<u64>,
) -> std::result::Result<Json<TopicDetail>, StatusCode> {
    let snapshot = store.get_all_content().await.map_err(store_failure)?;
    let topic = snapshot
        .topics
        .iter()
        .find(|t| t.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(TopicDetail::resolve(topic, &snapshot)))
}
