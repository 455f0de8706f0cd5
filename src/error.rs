//! Error types for proximity search.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a proximity search.
///
/// Records that cannot take part in a search (missing coordinates, missing
/// spatial key) are not errors; they are skipped and reported through
/// [`SkipReason`] instead.
#[derive(Error, Debug)]
pub enum NearbyError {
    /// Query rejected before any storage access (bad center or radius).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A range query against the store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The search did not finish within its deadline.
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`NearbyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Storage,
    Config,
    Internal,
}

impl NearbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NearbyError::InvalidInput(_) => ErrorKind::Validation,
            NearbyError::Storage(_) | NearbyError::Timeout(_) => ErrorKind::Storage,
            NearbyError::InvalidConfig(_) => ErrorKind::Config,
            NearbyError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller is at fault (as opposed to the store or the server).
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Why a stored record was left out of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingCoordinates,
    InvalidCoordinates,
    MissingGeohash,
    MalformedDocument,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::MissingCoordinates => "missing coordinates",
            SkipReason::InvalidCoordinates => "invalid coordinates",
            SkipReason::MissingGeohash => "missing geohash",
            SkipReason::MalformedDocument => "malformed document",
        };
        f.write_str(reason)
    }
}

pub type Result<T> = std::result::Result<T, NearbyError>;
