//! Error types for docuform-core

use std::path::{Path, PathBuf};

/// Result type alias for Docuform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the Docuform crates.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error without path context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a known path.
    #[error("I/O error at {}: {source}", .path.display())]
    IoPath {
        /// Path that was being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Input failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// Field or aspect that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// A named resource does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind ("template", "student", ...)
        kind: &'static str,
        /// Name or id that was looked up
        name: String,
    },
}

impl Error {
    /// Returns whether retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::IoPath { .. })
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found<S: Into<String>>(kind: &'static str, name: S) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::IoPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
