//! Error types for the sales tracker.

use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    /// True for failures of an external collaborator (network, auth).
    ///
    /// These are reported to the caller once and never retried.
    pub fn is_external(&self) -> bool {
        matches!(self, TrackerError::Auth(_) | TrackerError::Export(_))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for TrackerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for TrackerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        TrackerError::Deserialization(e.to_string())
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
