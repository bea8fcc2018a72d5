//!
//! Satchel: an offline-first content carrier core.
//!
//! A single carrier device pulls a content snapshot from a remote backend
//! while online, then acts as a local content server for peer devices over an
//! ad-hoc network with no backend connectivity, and later pushes back any
//! registrations collected offline.
//!
//! ## Core Concepts
//!
//! * **Store Engine (`store`)**: durable, versioned persistence for four
//!   record families (content, registrations, settings, session) with atomic
//!   multi-key writes and self-healing recreation on corruption.
//! * **Session Manager (`session`)**: login, verification, expiry and logout,
//!   built on the store engine.
//! * **Sync Controller (`sync`)**: downloads the full content snapshot and
//!   atomically replaces the local copy.
//! * **Registration Queue (`queue`)**: accumulates locally-created
//!   registrations and uploads them in bulk with dedup bookkeeping.
//! * **LAN Responder (`responder`)**: answers read-only content queries from
//!   peer devices using only the local snapshot.
//! * **Cleanup (`cleanup`)**: forced store deletion, logout cleanup and the
//!   emergency full reset.
//! * **Carrier (`carrier`)**: the top-level handle wiring all of the above.

pub mod carrier;
pub mod cleanup;
pub mod clock;
pub mod model;
pub mod queue;
pub mod remote;
pub mod responder;
pub mod session;
pub mod store;
pub mod sync;

pub use carrier::{Carrier, CarrierConfig, VerifyFallback};
pub use cleanup::CleanupOutcome;
pub use clock::{Clock, SystemClock};

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Satchel library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Satchel library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured persistence errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured remote backend errors from the remote module
    #[error(transparent)]
    Remote(remote::RemoteError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured responder lifecycle errors from the responder module
    #[error(transparent)]
    Responder(responder::ResponderError),
}

impl Error {
    /// Check if this error is a network failure (timeout or unreachable).
    ///
    /// Network failures are recoverable; the operator retries manually.
    pub fn is_network_error(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_network_error(),
            Error::Session(e) => e.is_network_error(),
            _ => false,
        }
    }

    /// Check if this error is an explicit credential/authorization rejection.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_auth_error(),
            Error::Session(e) => e.is_auth_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates persistence-layer corruption.
    ///
    /// Corruption triggers automatic forced recreation inside the store
    /// engine; callers only observe it when recreation itself failed.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::Store(e) => e.is_corruption(),
            _ => false,
        }
    }

    /// Check if this error is the fatal store-unavailable case requiring an
    /// operator-initiated emergency reset.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_unavailable(),
            _ => false,
        }
    }
}
