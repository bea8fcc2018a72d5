//! Error types for session management.

use thiserror::Error;

/// Errors that can occur during login.
///
/// A network failure is deliberately generic: callers must not be able to
/// tell whether the network or the credentials failed, so transport problems
/// never surface as credential errors and vice versa.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The backend explicitly rejected the credentials.
    #[error("Login rejected: {message}")]
    InvalidCredentials { message: String },

    /// Generic network failure (timeout or unreachable backend).
    #[error("Network error during login: {reason}")]
    Network { reason: String },

    /// The session could not be persisted after a successful login.
    #[error("Failed to persist session: {reason}")]
    Persistence { reason: String },
}

impl SessionError {
    /// Check if this is a network failure the operator may retry.
    pub fn is_network_error(&self) -> bool {
        matches!(self, SessionError::Network { .. })
    }

    /// Check if this is an explicit credential rejection.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SessionError::InvalidCredentials { .. })
    }
}

// Conversion from SessionError to the main Error type
impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
