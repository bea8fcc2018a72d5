//! Content sync controller.
//!
//! Downloads the full content snapshot from the remote backend and
//! atomically replaces the local copy. The snapshot is always replaced
//! wholesale; the dataset is small enough that a full refresh is cheaper
//! and less error-prone than reconciling deltas while offline peers may be
//! serving stale reads concurrently.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::{Result, model::SyncInfo, remote::RemoteClient, store::StoreEngine};

/// Counts from a successful snapshot download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub departments: usize,
    pub courses: usize,
    pub topics: usize,
    pub users: usize,
    pub timestamp: String,
}

/// Current sync state: what is cached and what is still waiting to go up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub sync_info: Option<SyncInfo>,
    pub departments: usize,
    pub courses: usize,
    pub topics: usize,
    pub premium_users: usize,
    pub pending_registrations: usize,
}

/// Pulls content snapshots into the store engine.
#[derive(Clone)]
pub struct SyncController {
    store: Arc<StoreEngine>,
    remote: Arc<RemoteClient>,
}

impl SyncController {
    pub(crate) fn new(store: Arc<StoreEngine>, remote: Arc<RemoteClient>) -> Self {
        Self { store, remote }
    }

    /// Download the full snapshot and replace the cached copy atomically.
    ///
    /// On any remote failure the error carries the backend's reported
    /// message when available, and the locally stored snapshot is left
    /// untouched; a failed download never partially clobbers cached
    /// content.
    pub async fn download_snapshot(&self) -> Result<SyncReport> {
        let payload = self.remote.bulk_download().await?;
        let report = SyncReport {
            departments: payload.departments.len(),
            courses: payload.courses.len(),
            topics: payload.topics.len(),
            users: payload.premium_users.len(),
            timestamp: payload.sync_timestamp.clone(),
        };
        self.store.replace_content(&payload.into_snapshot()).await?;
        info!(
            departments = report.departments,
            courses = report.courses,
            topics = report.topics,
            users = report.users,
            "snapshot downloaded"
        );
        Ok(report)
    }

    /// Sync metadata plus cached and pending counts, for status displays.
    pub async fn status(&self) -> Result<SyncStatus> {
        let snapshot = self.store.get_all_content().await?;
        let pending = self.store.unsynced_registrations().await?;
        Ok(SyncStatus {
            sync_info: snapshot.sync_info,
            departments: snapshot.departments.len(),
            courses: snapshot.courses.len(),
            topics: snapshot.topics.len(),
            premium_users: snapshot.premium_users.len(),
            pending_registrations: pending.len(),
        })
    }

    /// Drop all cached content. Registrations, settings and the session are
    /// untouched.
    pub async fn clear_content(&self) -> Result<()> {
        self.store.clear_content().await
    }
}
