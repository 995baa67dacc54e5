//! Error types for Strata operations.
//!
//! This module provides a common `Error` type and `Result<T>` alias used across
//! all Strata crates. Uses `thiserror` for derive macros.
//!
//! The error is `Clone` because a single failed invocation may be delivered to
//! many subscribers of the same cached result stream.

use thiserror::Error;

/// Errors that can occur in Strata operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A type name that the schema does not declare.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// An operation name that the schema does not declare.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The schema definition is inconsistent.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A remote operation failed.
    #[error("Invocation of {operation} failed: {message}")]
    Invocation {
        /// Qualified name of the operation.
        operation: String,
        /// Failure description reported by the invoker.
        message: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    /// Create an unknown operation error.
    pub fn unknown_operation(name: impl Into<String>) -> Self {
        Self::UnknownOperation(name.into())
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    /// Create an invocation error for the named operation.
    pub fn invocation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error that names the offending path.
    pub fn io_with_path(err: std::io::Error, path: &std::path::Path) -> Self {
        Self::Io(format!("{}: {err}", path.display()))
    }

    /// Whether a fresh attempt of the same work could succeed.
    ///
    /// Remote failures and I/O hiccups are transient; schema and data
    /// problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Invocation { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Strata's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================
