//! Cleanup and disaster recovery.
//!
//! Three escalating operations: forced store deletion, the logout cleanup
//! that always succeeds from the caller's point of view, and the emergency
//! full reset. None of them restart anything themselves. Instead of an
//! implicit full-process reload as the safety net, they return a typed
//! [`CleanupOutcome`] and the caller (CLI or embedding UI) decides what a
//! restart means. There is no ambient "is logging out" flag either: the
//! logout routine calls [`Cleanup::full_logout_cleanup`] explicitly.

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{remote::RemoteClient, store::StoreEngine};

/// How long to wait before escalating a blocked deletion. Open handles
/// cannot be force-closed from outside, so retrying indefinitely is useless.
const BLOCKED_DELAY: Duration = Duration::from_secs(1);

/// Result of a cleanup operation.
///
/// On `RestartRequired` the caller must tear down and reopen the carrier
/// (or tell the operator to relaunch) before continuing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Cleanup finished; the carrier can keep running.
    Completed,
    /// Cleanup could not finish in-process; a restart is the guaranteed
    /// terminal fallback.
    RestartRequired { reason: String },
}

impl CleanupOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CleanupOutcome::Completed)
    }
}

/// Cleanup operations over the store and the remote client's ambient
/// credential state.
#[derive(Clone)]
pub struct Cleanup {
    store: Arc<StoreEngine>,
    remote: Arc<RemoteClient>,
}

impl Cleanup {
    pub(crate) fn new(store: Arc<StoreEngine>, remote: Arc<RemoteClient>) -> Self {
        Self { store, remote }
    }

    /// Forced deletion of the entire persisted store.
    ///
    /// A blocked deletion waits briefly, then escalates rather than
    /// retrying indefinitely.
    pub async fn force_delete(&self) -> CleanupOutcome {
        match self.store.destroy().await {
            Ok(()) => {
                info!("store deleted");
                CleanupOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "store deletion blocked, escalating");
                tokio::time::sleep(BLOCKED_DELAY).await;
                CleanupOutcome::RestartRequired {
                    reason: format!("store deletion blocked: {e}"),
                }
            }
        }
    }

    /// Logout cleanup: clear session-adjacent ephemeral state and
    /// force-delete the store.
    ///
    /// Always succeeds from the caller's point of view; any internal failure
    /// is caught and escalated to `RestartRequired` as the guaranteed
    /// terminal fallback.
    pub async fn full_logout_cleanup(&self) -> CleanupOutcome {
        if let Err(e) = self.store.clear_session().await {
            warn!(error = %e, "failed to clear session during logout cleanup");
        }
        if let Err(e) = self.remote.reset_credentials() {
            warn!(error = %e, "failed to reset credentials during logout cleanup");
        }
        let outcome = self.force_delete().await;
        info!("logout cleanup complete");
        outcome
    }

    /// The most destructive operation: clear all local state of every kind.
    ///
    /// Only reachable via explicit, double-confirmed operator action; never
    /// triggered automatically. Always reports `RestartRequired`: after an
    /// emergency reset nothing in-process should be trusted.
    pub async fn emergency_reset(&self) -> CleanupOutcome {
        warn!("emergency reset initiated");
        if let Err(e) = self.store.clear_session().await {
            warn!(error = %e, "failed to clear session during emergency reset");
        }
        if let Err(e) = self.remote.reset_credentials() {
            warn!(error = %e, "failed to reset credentials during emergency reset");
        }
        if let Err(e) = self.store.destroy().await {
            warn!(error = %e, "failed to delete store during emergency reset");
        }
        CleanupOutcome::RestartRequired {
            reason: "emergency reset complete, relaunch required".to_string(),
        }
    }
}
