//! Top-level carrier handle and configuration.
//!
//! `Carrier` owns the wiring: it opens the store engine (running corruption
//! recovery as needed), builds the remote client, and hands out the
//! per-component handles. Components are cheap to construct; they share the
//! store, client and clock through `Arc`s, so accessors return fresh values
//! rather than references.

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    Result,
    cleanup::Cleanup,
    clock::{Clock, SystemClock},
    queue::RegistrationQueue,
    remote::RemoteClient,
    responder::LanResponder,
    session::SessionManager,
    store::StoreEngine,
    sync::SyncController,
};

/// Default bounded timeout for remote calls, tuned for constrained mobile
/// networks.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// What `verify_session` reports when the backend is unreachable.
///
/// The conservative default forces re-login rather than trusting a stale
/// session when connectivity is unreliable. Exactly one policy runs; the
/// fallback never deletes the stored session; only an explicit rejection
/// does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyFallback {
    /// Unreachable backend reads as "assume invalid": report false.
    #[default]
    AssumeInvalid,
    /// Unreachable backend reads as "assume valid": report whatever the
    /// local (expiry-checked) session says.
    AssumeValid,
}

/// Configuration for a carrier instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Base URL of the remote backend.
    pub backend_url: Url,
    /// Bounded timeout applied to every remote call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Store file location. `None` keeps the store purely in memory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Policy for `verify_session` on plain network failure.
    #[serde(default)]
    pub verify_fallback: VerifyFallback,
}

impl CarrierConfig {
    /// Configuration with defaults for everything but the backend URL.
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            store_path: None,
            verify_fallback: VerifyFallback::default(),
        }
    }

    /// The remote-call timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// The carrier: one offline-capable device acting as a content server for
/// peers.
pub struct Carrier {
    store: Arc<StoreEngine>,
    remote: Arc<RemoteClient>,
    clock: Arc<dyn Clock>,
    config: CarrierConfig,
}

impl Carrier {
    /// Open a carrier: loads (or recreates) the store and builds the remote
    /// client.
    pub async fn open(config: CarrierConfig) -> Result<Self> {
        Self::open_inner(config, Arc::new(SystemClock)).await
    }

    /// Open with a caller-supplied clock, for tests that need to control
    /// session expiry and retention windows.
    #[cfg(any(test, feature = "testing"))]
    pub async fn open_with_clock(config: CarrierConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open_inner(config, clock).await
    }

    async fn open_inner(config: CarrierConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Arc::new(StoreEngine::open(config.store_path.clone()).await?);
        let remote = Arc::new(RemoteClient::new(
            config.backend_url.clone(),
            config.request_timeout(),
        )?);
        Ok(Self {
            store,
            remote,
            clock,
            config,
        })
    }

    /// The configuration this carrier was opened with.
    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    /// Direct access to the store engine.
    pub fn store(&self) -> &Arc<StoreEngine> {
        &self.store
    }

    /// The session manager.
    pub fn session(&self) -> SessionManager {
        SessionManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.remote),
            Arc::clone(&self.clock),
            self.config.verify_fallback,
        )
    }

    /// The content sync controller.
    pub fn sync(&self) -> SyncController {
        SyncController::new(Arc::clone(&self.store), Arc::clone(&self.remote))
    }

    /// The registration queue and uploader.
    pub fn queue(&self) -> RegistrationQueue {
        RegistrationQueue::new(
            Arc::clone(&self.store),
            Arc::clone(&self.remote),
            Arc::clone(&self.clock),
        )
    }

    /// A LAN responder over this carrier's snapshot.
    pub fn responder(&self) -> LanResponder {
        LanResponder::new(Arc::clone(&self.store))
    }

    /// Cleanup and disaster-recovery operations.
    pub fn cleanup(&self) -> Cleanup {
        Cleanup::new(Arc::clone(&self.store), Arc::clone(&self.remote))
    }
}
