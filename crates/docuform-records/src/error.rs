//! Error types for docuform-records

/// Result type alias for record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or querying student records.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error from docuform-core (configuration, I/O, not found)
    #[error(transparent)]
    Core(#[from] docuform_core::Error),

    /// The CSV data could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The record source answered with an error status
    #[error("Record source returned HTTP {status}: {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Reason phrase or body excerpt
        message: String,
    },

    /// The configured id column is not in the header row
    #[error("Column '{column}' not found; available columns: {}", .available.join(", "))]
    MissingColumn {
        /// Column that was expected
        column: String,
        /// Columns present in the data
        available: Vec<String>,
    },

    /// No record source is configured
    #[error("No student record source configured")]
    NotConfigured,

    /// Internal state could not be accessed
    #[error("Record cache unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Returns `true` when a looked-up student does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_not_found())
    }

    /// Returns `true` when the failure came from the record source.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Upstream { .. } | Error::Csv(_) | Error::Unavailable(_)
        )
    }

    /// Returns `true` for configuration problems an operator must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingColumn { .. }
                | Error::NotConfigured
                | Error::Core(docuform_core::Error::Config { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_display() {
        let err = Error::MissingColumn {
            column: "Student ID".into(),
            available: vec!["Name".into(), "Grade".into()],
        };
        assert_eq!(
            err.to_string(),
            "Column 'Student ID' not found; available columns: Name, Grade"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_classification() {
        assert!(Error::Core(docuform_core::Error::not_found("student", "42")).is_not_found());
        assert!(
            Error::Upstream {
                status: 500,
                message: "oops".into()
            }
            .is_upstream()
        );
        assert!(Error::NotConfigured.is_configuration());
    }
}
