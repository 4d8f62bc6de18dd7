//! Error types for imview
//!
//! One taxonomy is shared by all backends so that consumers can branch on
//! a machine-checkable kind regardless of where an entity came from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by providers and by NeXus resolution
#[derive(Debug, Error)]
pub enum ImviewError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No entity found at {0}")]
    EntityNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unsupported type descriptor: {0}")]
    UnsupportedType(String),

    #[error("Broken default path: {0}")]
    BrokenDefaultPath(String),

    #[error("No signal dataset in group: {0}")]
    MissingSignal(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for imview operations
pub type ImviewResult<T> = Result<T, ImviewError>;

/// Machine-checkable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    FileNotFound,
    EntityNotFound,
    AccessDenied,
    UnsupportedType,
    BrokenDefaultPath,
    MissingSignal,
    Transport,
    ShapeMismatch,
    InvalidFormat,
}

impl ImviewError {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImviewError::FileNotFound(_) => ErrorKind::FileNotFound,
            ImviewError::EntityNotFound(_) => ErrorKind::EntityNotFound,
            ImviewError::AccessDenied(_) => ErrorKind::AccessDenied,
            ImviewError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            ImviewError::BrokenDefaultPath(_) => ErrorKind::BrokenDefaultPath,
            ImviewError::MissingSignal(_) => ErrorKind::MissingSignal,
            ImviewError::Transport(_) => ErrorKind::Transport,
            ImviewError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            ImviewError::InvalidFormat(_) => ErrorKind::InvalidFormat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = ImviewError::EntityNotFound("/nx_data/signal".to_string());
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);

        let err = ImviewError::ShapeMismatch {
            expected: 6,
            actual: 5,
        };
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_error_messages() {
        let err = ImviewError::UnsupportedType("<x9".to_string());
        assert_eq!(err.to_string(), "Unsupported type descriptor: <x9");
    }
}
