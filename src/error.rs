//! Error types for lsmkv
//!
//! Provides a unified error type for all operations. A missing key is not an
//! error: lookups report it as `Ok(None)`.

use thiserror::Error;

/// Result type alias using LsmError
pub type Result<T> = std::result::Result<T, LsmError>;

/// Unified error type for lsmkv operations
#[derive(Debug, Error)]
pub enum LsmError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    /// A segment, WAL or snapshot file holds something that does not decode
    #[error("Corruption in {location}: {reason}")]
    Corruption { location: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Structural Errors
    // -------------------------------------------------------------------------
    /// A red-black tree invariant does not hold. Never repaired at runtime.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),

    #[error("Compaction error: {0}")]
    Compaction(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LsmError {
    /// Build a corruption error for a named file or component
    pub fn corruption(location: impl Into<String>, reason: impl Into<String>) -> Self {
        LsmError::Corruption {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LsmError {
    fn from(e: serde_json::Error) -> Self {
        LsmError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for LsmError {
    fn from(e: bincode::Error) -> Self {
        LsmError::Serialization(e.to_string())
    }
}
