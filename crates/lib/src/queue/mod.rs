//! Registration queue and uploader.
//!
//! Registrations collected while offline accumulate here with `synced =
//! false` and go up in one bulk call. There is no internal retry loop;
//! retries are operator-driven, since retrying blindly while offline wastes
//! battery and bandwidth on a hotspot-constrained device.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::{
    Result,
    clock::Clock,
    model::PendingRegistration,
    remote::{RegistrationPayload, RemoteClient, RemoteError},
    store::StoreEngine,
};

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// A registration as handed in by the LAN-facing intake flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub name: String,
    pub code: String,
    pub department_id: Option<u64>,
}

/// Outcome of an upload: how many went up, and the backend's verdict on
/// each. Per-record validation errors are reported here without aborting
/// the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: usize,
    pub created: u64,
    pub duplicates: u64,
    pub errors: Vec<String>,
}

impl UploadReport {
    /// Nothing to upload.
    fn empty() -> Self {
        Self {
            uploaded: 0,
            created: 0,
            duplicates: 0,
            errors: Vec::new(),
        }
    }
}

/// Accumulates pending registrations and pushes them to the backend.
#[derive(Clone)]
pub struct RegistrationQueue {
    store: Arc<StoreEngine>,
    remote: Arc<RemoteClient>,
    clock: Arc<dyn Clock>,
}

impl RegistrationQueue {
    pub(crate) fn new(
        store: Arc<StoreEngine>,
        remote: Arc<RemoteClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            remote,
            clock,
        }
    }

    /// Insert a new registration with `synced = false`. Returns the
    /// store-assigned id.
    pub async fn enqueue(&self, registration: NewRegistration) -> Result<u64> {
        let record = PendingRegistration {
            id: 0,
            name: registration.name,
            code: registration.code,
            department_id: registration.department_id,
            synced: false,
            created_at: self.clock.now_millis(),
            synced_at: None,
        };
        self.store.insert_registration(&record).await
    }

    /// Registrations still awaiting upload, via the `synced` index.
    pub async fn list_unsynced(&self) -> Result<Vec<PendingRegistration>> {
        self.store.unsynced_registrations().await
    }

    /// Every registration, synced or not.
    pub async fn list_all(&self) -> Result<Vec<PendingRegistration>> {
        self.store.all_registrations().await
    }

    /// Upload all unsynced registrations in one bulk call.
    ///
    /// With nothing pending this is a no-op success and no network call is
    /// made. On success, only the records that were part of this call's
    /// payload are marked synced; the backend never saw anything enqueued
    /// after dispatch. On failure every record stays unsynced.
    pub async fn upload_pending(&self) -> Result<UploadReport> {
        let pending = self.store.unsynced_registrations().await?;
        if pending.is_empty() {
            return Ok(UploadReport::empty());
        }

        let payload: Vec<RegistrationPayload> = pending
            .iter()
            .map(|r| RegistrationPayload {
                name: r.name.clone(),
                code: r.code.clone(),
                department_id: r.department_id,
            })
            .collect();

        let response = self.remote.upload_users(&payload).await?;
        if !response.success {
            return Err(RemoteError::Rejected {
                message: "upload rejected by backend".to_string(),
            }
            .into());
        }

        let ids: Vec<u64> = pending.iter().map(|r| r.id).collect();
        self.store
            .mark_registrations_synced(&ids, self.clock.now_millis())
            .await?;

        info!(
            uploaded = ids.len(),
            created = response.created,
            duplicates = response.duplicates,
            errored = response.errors.len(),
            "registrations uploaded"
        );
        Ok(UploadReport {
            uploaded: ids.len(),
            created: response.created,
            duplicates: response.duplicates,
            errors: response.errors,
        })
    }

    /// Permanently remove every synced registration. Unsynced records are
    /// never touched, whatever is interleaved with this call.
    pub async fn delete_synced(&self) -> Result<usize> {
        let synced = self.store.synced_registrations().await?;
        let ids: Vec<u64> = synced.iter().map(|r| r.id).collect();
        self.store.delete_registrations(&ids).await
    }

    /// Apply the auto-delete retention policy: remove synced registrations
    /// whose acknowledgment is older than the configured window. Returns
    /// how many were removed. A disabled policy is a no-op.
    pub async fn apply_retention(&self) -> Result<usize> {
        if !self.store.auto_delete_enabled().await? {
            return Ok(0);
        }
        let days = self.store.delete_after_days().await?;
        let cutoff = self.clock.now_millis().saturating_sub(days * DAY_MS);
        let expired: Vec<u64> = self
            .store
            .synced_registrations()
            .await?
            .into_iter()
            .filter(|r| r.synced_at.is_some_and(|t| t < cutoff))
            .map(|r| r.id)
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete_registrations(&expired).await?;
        info!(removed, days, "retention sweep removed synced registrations");
        Ok(removed)
    }
}
