//! Error types for docuform-cli

use thiserror::Error;

/// Result type alias for docuform-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docuform-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from docuform-core
    #[error(transparent)]
    Core(#[from] docuform_core::Error),

    /// Error from docuform-docx
    #[error(transparent)]
    Template(#[from] docuform_docx::TemplateError),

    /// Error from docuform-records
    #[error(transparent)]
    Records(#[from] docuform_records::Error),

    /// Error from docuform-api
    #[error(transparent)]
    Api(#[from] docuform_api::Error),

    /// A values file or `--set` value is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Arguments that parse but do not make sense together
    #[error("{0}")]
    Usage(String),
}
