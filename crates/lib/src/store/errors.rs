//! Error types for the local store engine.
//!
//! This module defines structured error types for persistence operations.
//! The three corruption classes (version-ahead, missing family, failed open)
//! are distinguished so the engine's recovery path can treat them uniformly
//! while reporting them precisely.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The persisted schema version is higher than this build expects.
    ///
    /// Historically caused by a previous build bumping versions
    /// inconsistently; always treated as corruption and recovered from.
    #[error("Stored schema version {stored} is ahead of expected {expected}")]
    VersionAhead { stored: u32, expected: u32 },

    /// A required record family is missing after creation.
    #[error("Record family '{family}' missing after creation")]
    MissingFamily { family: String },

    /// The store could not be opened at all.
    #[error("Failed to open store: {reason}")]
    OpenFailed { reason: String },

    /// Recreation after forced deletion failed. Fatal: a destructive manual
    /// reset is required.
    #[error("Store unavailable after failed recreation: {reason}")]
    Unavailable { reason: String },

    /// Forced deletion of the persisted store was blocked.
    #[error("Store deletion blocked: {reason}")]
    DeleteBlocked { reason: String },

    /// Operation addressed a record family that does not exist.
    #[error("Unknown record family '{family}'")]
    UnknownFamily { family: String },

    /// Operation addressed a secondary index that does not exist.
    #[error("Record family '{family}' has no index '{index}'")]
    UnknownIndex { family: String, index: String },

    /// Key not found in the given record family.
    #[error("Key '{key}' not found in record family '{family}'")]
    KeyNotFound { family: String, key: String },

    /// Record (de)serialization failed.
    #[error("Failed to decode record in family '{family}': {reason}")]
    DecodeFailed { family: String, reason: String },

    /// File I/O error while persisting or loading the store.
    #[error("Store file I/O error")]
    FileIo {
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Check if this error is one of the corruption classes that trigger
    /// forced recreation.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::VersionAhead { .. }
                | StoreError::MissingFamily { .. }
                | StoreError::OpenFailed { .. }
        )
    }

    /// Check if this is the fatal store-unavailable case.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound { .. })
    }

    /// Check if this error is related to file I/O.
    pub fn is_io_error(&self) -> bool {
        matches!(self, StoreError::FileIo { .. })
    }
}

// Conversion from StoreError to the main Error type
impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
