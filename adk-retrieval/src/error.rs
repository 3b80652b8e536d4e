//! Error types for the `adk-retrieval` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Validation failures are always raised before any embedding or storage
/// call is made. None of these errors are retried inside the crate.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A malformed filter expression, retrieval configuration, or call argument.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The embedding provider failed to produce vectors.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The storage engine failed to execute a query or insert.
    #[error("Storage error ({backend}): {message}")]
    Storage {
        /// The storage backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A blocking entry point could not drive its future to completion.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RetrievalError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` for errors raised before any I/O was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
