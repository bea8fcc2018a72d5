//! Error types for remote backend communication.

use thiserror::Error;

/// Errors that can occur talking to the remote backend.
///
/// The taxonomy mirrors how callers react: network-class errors are
/// recoverable and retried by the operator, authorization rejections clear
/// the session and are never retried automatically, and rejections carry the
/// backend's reported message when one was available.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// The HTTP client itself could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },

    /// The bounded timeout expired before the backend answered.
    #[error("Request to {endpoint} timed out after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    /// Transport-level failure (unreachable host, connection reset, ...).
    #[error("Network error calling {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    /// Explicit authorization rejection (HTTP 401/403).
    #[error("Backend rejected the request as unauthorized")]
    Unauthorized,

    /// The backend refused the request and reported why.
    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },

    /// The backend answered with something that could not be decoded.
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl RemoteError {
    /// Check if this is a network/timeout failure the operator may retry.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            RemoteError::Timeout { .. } | RemoteError::Network { .. }
        )
    }

    /// Check if this is an explicit authorization rejection.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, RemoteError::Unauthorized)
    }

    /// Check if this is a backend-reported rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, RemoteError::Rejected { .. })
    }
}

// Conversion from RemoteError to the main Error type
impl From<RemoteError> for crate::Error {
    fn from(err: RemoteError) -> Self {
        crate::Error::Remote(err)
    }
}
