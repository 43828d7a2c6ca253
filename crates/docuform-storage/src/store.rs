//! The template store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuform_core::TemplateName;
use docuform_docx::DocxPackage;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a store knows about a template without downloading it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMeta {
    /// File name, e.g. `Enrollment Letter.docx`.
    pub name: TemplateName,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the backend reports one.
    pub updated: Option<DateTime<Utc>>,
}

impl TemplateMeta {
    /// Metadata for freshly written bytes.
    pub fn now(name: TemplateName, size: usize) -> Self {
        Self {
            name,
            size: size as u64,
            updated: Some(Utc::now()),
        }
    }
}

/// Storage for DOCX templates.
///
/// Names are validated [`TemplateName`]s, so implementations may use them
/// directly as file names or object keys.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// All templates, sorted by name.
    async fn list(&self) -> Result<Vec<TemplateMeta>>;

    /// Template bytes, or [`Error::NotFound`].
    async fn get(&self, name: &TemplateName) -> Result<Vec<u8>>;

    /// Store a template, replacing any existing one with the same name.
    ///
    /// Implementations call [`validate_template`] first.
    async fn put(&self, name: &TemplateName, bytes: Vec<u8>) -> Result<TemplateMeta>;

    /// Remove a template, or fail with [`Error::NotFound`].
    async fn delete(&self, name: &TemplateName) -> Result<()>;

    /// Whether a template exists.
    async fn exists(&self, name: &TemplateName) -> Result<bool> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Reject bytes that are not a DOCX package.
pub fn validate_template(name: &TemplateName, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::InvalidTemplate(format!("{name} is empty")));
    }
    DocxPackage::from_bytes(bytes)
        .map(|_| ())
        .map_err(|e| Error::InvalidTemplate(format!("{name}: {e}")))
}

/// Sort metadata by name, in place.
pub(crate) fn sort_by_name(items: &mut [TemplateMeta]) {
    items.sort_by(|a, b| a.name.cmp(&b.name));
}
