//! Error types for docuform-api and their HTTP mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docuform_docx::TemplateError;
use serde_json::json;

/// Result type alias for docuform-api operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving requests
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error from docuform-core
    #[error(transparent)]
    Core(#[from] docuform_core::Error),

    /// Error from docuform-docx
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Error from docuform-storage
    #[error(transparent)]
    Storage(#[from] docuform_storage::Error),

    /// Error from docuform-records
    #[error(transparent)]
    Records(#[from] docuform_records::Error),

    /// The request is malformed
    #[error("{0}")]
    BadRequest(String),

    /// A background task failed
    #[error("Internal error: {0}")]
    Internal(String),

    /// Server I/O (binding the listener, serving connections)
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status and error category for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        use docuform_core::Error as Core;

        match self {
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            Error::Core(e) => classify_core(e),

            Error::Template(TemplateError::Html(_) | TemplateError::Delimiters(_)) => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            Error::Template(e) if e.is_template_syntax() || e.is_invalid_package() => {
                (StatusCode::UNPROCESSABLE_ENTITY, "template")
            }
            Error::Template(TemplateError::ConverterUnavailable(_)) => {
                (StatusCode::NOT_IMPLEMENTED, "unavailable")
            }
            Error::Template(TemplateError::Conversion(_)) => (StatusCode::BAD_GATEWAY, "conversion"),
            Error::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),

            Error::Storage(e) if e.is_not_found() => (StatusCode::NOT_FOUND, "not_found"),
            Error::Storage(e) if e.is_invalid_input() => (StatusCode::BAD_REQUEST, "validation"),
            Error::Storage(e) if e.is_upstream() => (StatusCode::BAD_GATEWAY, "upstream"),
            Error::Storage(docuform_storage::Error::Core(e)) => classify_core(e),
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),

            Error::Records(e) if e.is_not_found() => (StatusCode::NOT_FOUND, "not_found"),
            Error::Records(docuform_records::Error::NotConfigured) => {
                (StatusCode::NOT_IMPLEMENTED, "unavailable")
            }
            Error::Records(e) if e.is_upstream() => (StatusCode::BAD_GATEWAY, "upstream"),
            Error::Records(e) if e.is_configuration() => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
            }
            Error::Records(docuform_records::Error::Core(Core::Validation { .. })) => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            Error::Records(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),

            Error::Internal(_) | Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

// Extractor rejections answer in the same envelope as handler errors.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

fn classify_core(e: &docuform_core::Error) -> (StatusCode, &'static str) {
    use docuform_core::Error as Core;
    match e {
        Core::Validation { .. } | Core::Serialization(_) => (StatusCode::BAD_REQUEST, "validation"),
        Core::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        Core::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

/// JSON error response in the `{"error": {"category", "message"}}` envelope.
pub fn error_response(status: StatusCode, category: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "category": category,
            "message": message,
        }
    });
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, category) = self.classify();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, category, "{message}");
        } else {
            tracing::debug!(%status, category, "{message}");
        }
        error_response(status, category, &message)
    }
}
