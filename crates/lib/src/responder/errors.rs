//! Error types for the LAN responder lifecycle.
//!
//! Request-level misses are HTTP 404s and never cross this API as error
//! values; these variants cover only starting and stopping the server.

use thiserror::Error;

/// Errors that can occur managing the responder server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResponderError {
    /// Attempted to start a server when one is already running.
    #[error("Responder already running on {address}")]
    ServerAlreadyRunning { address: String },

    /// Attempted to stop a server when none is running.
    #[error("Responder not running")]
    ServerNotRunning,

    /// Server bind error.
    #[error("Failed to bind responder to {address}: {reason}")]
    Bind { address: String, reason: String },
}

impl ResponderError {
    /// Check if this is a server lifecycle error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ResponderError::ServerAlreadyRunning { .. } | ResponderError::ServerNotRunning
        )
    }
}

// Conversion from ResponderError to the main Error type
impl From<ResponderError> for crate::Error {
    fn from(err: ResponderError) -> Self {
        crate::Error::Responder(err)
    }
}
