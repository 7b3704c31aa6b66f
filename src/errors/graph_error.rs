//! Graph-related error types.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building, versioning, composing, persisting
/// or executing a graph.
///
/// Every check runs eagerly, at construction or composition time. None of
/// these errors is retryable.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Malformed graph: undefined slot, shape/type mismatch, unproduced output.
    #[error("Invalid graph: {message}")]
    Validation { message: String },

    #[error("Node '{node}' ({operator}) has no valid form at opset {version}: {reason}")]
    UnsupportedVersion {
        node: String,
        operator: String,
        version: u32,
        reason: String,
    },

    #[error("Cannot compose graphs: {message}")]
    Composition { message: String },

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Training error: {message}")]
    Training { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn composition(message: impl Into<String>) -> Self {
        Self::Composition {
            message: message.into(),
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub(crate) fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }
}
