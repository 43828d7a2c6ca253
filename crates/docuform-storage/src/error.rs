//! Error types for docuform-storage

/// Result type alias for template store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by template stores.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error from docuform-core (validation, configuration, I/O)
    #[error(transparent)]
    Core(#[from] docuform_core::Error),

    /// The template does not exist in this store
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Uploaded bytes are not a usable DOCX package
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connection refused, timeout, bad body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with an error status
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Credentials could not be obtained or were rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Internal state could not be accessed
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Returns `true` when the template does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Core(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` when the failure came from a remote service rather
    /// than from the request itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Upstream { .. } | Error::Auth(_) | Error::Unavailable(_)
        )
    }

    /// Returns `true` for input the caller can fix.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Error::InvalidTemplate(_) => true,
            Error::Core(docuform_core::Error::Validation { .. }) => true,
            _ => false,
        }
    }
}
