//! Template names and field-key normalization.
//!
//! Template names double as object keys in remote storage and as file
//! names in the local cache, so they are validated once at the edge and
//! carried around as [`TemplateName`] afterwards.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest accepted template name, in bytes.
pub const MAX_TEMPLATE_NAME_LEN: usize = 255;

/// Required template file extension (compared case-insensitively).
pub const TEMPLATE_EXTENSION: &str = ".docx";

/// A validated DOCX template file name such as `Enrollment Letter.docx`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateName(String);

impl TemplateName {
    /// Validate and wrap a template name.
    ///
    /// Leading/trailing whitespace is trimmed. The name must end in `.docx`,
    /// must not contain path separators, `..`, or control characters.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::validation_field("name", "template name is empty"));
        }
        if name.len() > MAX_TEMPLATE_NAME_LEN {
            return Err(Error::validation_field(
                "name",
                format!("template name exceeds {MAX_TEMPLATE_NAME_LEN} bytes"),
            ));
        }
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::validation_field(
                "name",
                format!("template name '{name}' must not contain path components"),
            ));
        }
        if name.chars().any(char::is_control) {
            return Err(Error::validation_field(
                "name",
                "template name contains control characters",
            ));
        }
        if !has_docx_extension(name) || name.len() == TEMPLATE_EXTENSION.len() {
            return Err(Error::validation_field(
                "name",
                format!("template name '{name}' must end with {TEMPLATE_EXTENSION}"),
            ));
        }

        Ok(Self(name.to_string()))
    }

    /// Derive a template name from a file path's final component.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::validation_field("name", "path has no file name"))?;
        Self::parse(file_name)
    }

    /// The full file name, including extension.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file name without its `.docx` extension.
    pub fn display_name(&self) -> &str {
        &self.0[..self.0.len() - TEMPLATE_EXTENSION.len()]
    }

    /// Name for a rendered copy of this template, e.g. `Letter (Jane Doe).docx`.
    pub fn rendered_file_name(&self, label: Option<&str>, extension: &str) -> String {
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => format!("{} ({label}).{extension}", self.display_name()),
            None => format!("{}.{extension}", self.display_name()),
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TemplateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TemplateName> for String {
    fn from(name: TemplateName) -> Self {
        name.0
    }
}

impl std::str::FromStr for TemplateName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Returns `true` if `name` ends with `.docx`, ignoring case.
pub fn has_docx_extension(name: &str) -> bool {
    name.len() >= TEMPLATE_EXTENSION.len()
        && name.is_char_boundary(name.len() - TEMPLATE_EXTENSION.len())
        && name[name.len() - TEMPLATE_EXTENSION.len()..].eq_ignore_ascii_case(TEMPLATE_EXTENSION)
}

/// Normalize a field or column label into a comparison key.
///
/// Keeps only alphanumeric characters, lowercased, so that spreadsheet
/// headers and template tags written in different styles still match.
///
/// # Examples
///
/// ```
/// use docuform_core::util::names::normalize_field_key;
///
/// assert_eq!(normalize_field_key("Student ID"), "studentid");
/// assert_eq!(normalize_field_key("student_id"), "studentid");
/// assert_eq!(normalize_field_key("  First-Name "), "firstname");
/// ```
pub fn normalize_field_key(label: &str) -> String {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}
