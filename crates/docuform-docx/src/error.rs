//! Error types for docuform-docx

/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors raised while opening, scanning, rendering, or converting templates.
///
/// Syntax errors carry the name of the package part (`word/document.xml`,
/// `word/header1.xml`, ...) so a user can find the offending tag.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// The bytes are not a readable zip archive.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error while reading or writing package entries.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive expands past the unpacked size limit.
    #[error("Package expands beyond {limit} bytes")]
    TooLarge {
        /// Limit in bytes
        limit: u64,
    },

    /// A required package part is absent.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// A part is not well-formed enough to process.
    #[error("Invalid XML in {part}: {message}")]
    Xml {
        /// Package part name
        part: String,
        /// What went wrong
        message: String,
    },

    /// An opening delimiter without a closing one.
    #[error("Unclosed tag in {part} near '{context}'")]
    UnclosedTag {
        /// Package part name
        part: String,
        /// Text following the opening delimiter
        context: String,
    },

    /// A closing delimiter without an opening one.
    #[error("Unopened tag in {part} near '{context}'")]
    UnopenedTag {
        /// Package part name
        part: String,
        /// Text preceding the closing delimiter
        context: String,
    },

    /// A tag with no name, such as `{}` or `{#}`.
    #[error("Empty tag in {part}")]
    EmptyTag {
        /// Package part name
        part: String,
    },

    /// A section that is never closed.
    #[error("Unclosed section '{name}' in {part}")]
    UnclosedSection {
        /// Package part name
        part: String,
        /// Section name
        name: String,
    },

    /// A closing section tag with no matching opening tag.
    #[error("Closing tag '/{name}' in {part} has no opening tag")]
    UnopenedSection {
        /// Package part name
        part: String,
        /// Section name
        name: String,
    },

    /// A section closed under a different name.
    #[error("Section '{open}' in {part} is closed by '/{close}'")]
    MismatchedSection {
        /// Package part name
        part: String,
        /// Name on the opening tag
        open: String,
        /// Name on the closing tag
        close: String,
    },

    /// A section whose placement cannot be expanded safely.
    #[error("Section '{name}' in {part}: {message}")]
    SectionStructure {
        /// Package part name
        part: String,
        /// Section name
        name: String,
        /// What is wrong with the placement
        message: String,
    },

    /// HTML that could not be converted.
    #[error("Invalid HTML: {0}")]
    Html(String),

    /// Invalid delimiter configuration.
    #[error("Invalid delimiters: {0}")]
    Delimiters(String),

    /// No PDF converter could be started.
    #[error("PDF conversion unavailable: {0}")]
    ConverterUnavailable(String),

    /// The converter ran but did not produce a PDF.
    #[error("PDF conversion failed: {0}")]
    Conversion(String),
}

impl TemplateError {
    /// Returns `true` for errors caused by the template's own content
    /// (bad tags, unbalanced sections) rather than by the environment.
    pub fn is_template_syntax(&self) -> bool {
        matches!(
            self,
            TemplateError::UnclosedTag { .. }
                | TemplateError::UnopenedTag { .. }
                | TemplateError::EmptyTag { .. }
                | TemplateError::UnclosedSection { .. }
                | TemplateError::UnopenedSection { .. }
                | TemplateError::MismatchedSection { .. }
                | TemplateError::SectionStructure { .. }
        )
    }

    /// Returns `true` when the input is not a usable DOCX package.
    pub fn is_invalid_package(&self) -> bool {
        matches!(
            self,
            TemplateError::Archive(_)
                | TemplateError::TooLarge { .. }
                | TemplateError::MissingPart(_)
                | TemplateError::Xml { .. }
                | TemplateError::Html(_)
        )
    }
}
