//! Session lifecycle: login, verification, expiry, logout.
//!
//! The session moves through `NoSession → Pending(login in flight) → Active
//! → {Expired, LoggedOut}`. `Expired` is indistinguishable from `NoSession`
//! for every read contract: the expiry invariant is applied on read, and an
//! expired record is deleted the moment it is observed. Successful periodic
//! verification refreshes the expiry window (`Active → Active`).
//!
//! Login gates whether the sync controller and uploader may run; both check
//! for a live session through [`SessionManager::get_session`].

pub mod errors;

pub use errors::SessionError;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    Result,
    carrier::VerifyFallback,
    clock::Clock,
    cleanup::{Cleanup, CleanupOutcome},
    model::Session,
    remote::{RemoteClient, RemoteError},
    store::StoreEngine,
};

/// Manages the single operator session on top of the store engine.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<StoreEngine>,
    remote: Arc<RemoteClient>,
    clock: Arc<dyn Clock>,
    fallback: VerifyFallback,
}

impl SessionManager {
    pub(crate) fn new(
        store: Arc<StoreEngine>,
        remote: Arc<RemoteClient>,
        clock: Arc<dyn Clock>,
        fallback: VerifyFallback,
    ) -> Self {
        Self {
            store,
            remote,
            clock,
            fallback,
        }
    }

    /// Log in against the remote backend and persist the session.
    ///
    /// Transport failures surface as a generic network error, never a
    /// credential-specific one, so callers cannot distinguish "wrong
    /// password" from "no connectivity" on a failed link.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response = match self.remote.login(username, password).await {
            Ok(response) => response,
            Err(crate::Error::Remote(e)) if e.is_network_error() => {
                return Err(SessionError::Network {
                    reason: e.to_string(),
                }
                .into());
            }
            Err(crate::Error::Remote(RemoteError::Unauthorized)) => {
                return Err(SessionError::InvalidCredentials {
                    message: "invalid username or password".to_string(),
                }
                .into());
            }
            Err(crate::Error::Remote(RemoteError::Rejected { message })) => {
                return Err(SessionError::InvalidCredentials { message }.into());
            }
            Err(e) => return Err(e),
        };

        if !response.success {
            return Err(SessionError::InvalidCredentials {
                message: response
                    .error
                    .unwrap_or_else(|| "invalid username or password".to_string()),
            }
            .into());
        }

        let session = Session::starting_at(
            response.username,
            response.user_id,
            response.is_admin,
            self.clock.now_millis(),
        );
        self.store
            .put_session(&session)
            .await
            .map_err(|e| SessionError::Persistence {
                reason: e.to_string(),
            })?;
        debug!(username = %session.username, "session established");
        Ok(session)
    }

    /// Current session, with the expiry invariant applied.
    ///
    /// Never errors: storage failures degrade to `None`, and an expired
    /// record is deleted as a side effect of being observed.
    pub async fn get_session(&self) -> Option<Session> {
        let session = match self.store.get_session_record().await {
            Ok(session) => session?,
            Err(e) => {
                debug!(error = %e, "session read failed, treating as no session");
                return None;
            }
        };
        if session.is_expired_at(self.clock.now_millis()) {
            debug!(username = %session.username, "session expired, clearing");
            if let Err(e) = self.store.clear_session().await {
                warn!(error = %e, "failed to clear expired session");
            }
            return None;
        }
        Some(session)
    }

    /// Verify the session against the backend.
    ///
    /// An explicit authorization rejection clears the local session. A plain
    /// network failure resolves per the configured [`VerifyFallback`]; the
    /// conservative default reports false without deleting the stored
    /// record, so the session is usable again once connectivity returns and
    /// verification succeeds.
    pub async fn verify_session(&self) -> bool {
        match self.remote.me().await {
            Ok(me) if me.authenticated => {
                let refreshed = Session::starting_at(
                    me.username,
                    me.user_id,
                    me.is_admin,
                    self.clock.now_millis(),
                );
                if let Err(e) = self.store.put_session(&refreshed).await {
                    warn!(error = %e, "failed to refresh verified session");
                }
                true
            }
            Ok(_) => {
                self.clear_session_quietly().await;
                false
            }
            Err(e) if e.is_auth_error() => {
                self.clear_session_quietly().await;
                false
            }
            Err(e) => {
                debug!(error = %e, fallback = ?self.fallback, "verification unreachable");
                match self.fallback {
                    VerifyFallback::AssumeInvalid => false,
                    VerifyFallback::AssumeValid => self.get_session().await.is_some(),
                }
            }
        }
    }

    /// Log out: best-effort remote call, then unconditional local cleanup.
    ///
    /// The remote call's failure is swallowed; the operator must never be
    /// left appearing logged in locally after the backend invalidated the
    /// session, and cleanup always runs.
    pub async fn logout(&self) -> CleanupOutcome {
        if let Err(e) = self.remote.logout().await {
            warn!(error = %e, "remote logout failed, proceeding with local cleanup");
        }
        Cleanup::new(Arc::clone(&self.store), Arc::clone(&self.remote))
            .full_logout_cleanup()
            .await
    }

    async fn clear_session_quietly(&self) {
        if let Err(e) = self.store.clear_session().await {
            warn!(error = %e, "failed to clear rejected session");
        }
    }
}
