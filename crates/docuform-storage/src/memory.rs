//! In-process template store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use docuform_core::TemplateName;

use crate::store::{TemplateMeta, TemplateStore, validate_template};
use crate::{Error, Result};

struct Stored {
    bytes: Vec<u8>,
    meta: TemplateMeta,
}

/// Templates held in memory; everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<BTreeMap<TemplateName, Stored>>,
}

impl MemoryTemplateStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> Error {
        Error::Unavailable(format!("template map lock poisoned: {e}"))
    }
}

impl std::fmt::Debug for MemoryTemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.templates.read().map(|t| t.len()).unwrap_or(0);
        f.debug_struct("MemoryTemplateStore")
            .field("templates", &count)
            .finish()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<TemplateMeta>> {
        let templates = self.templates.read().map_err(Self::poisoned)?;
        Ok(templates.values().map(|s| s.meta.clone()).collect())
    }

    async fn get(&self, name: &TemplateName) -> Result<Vec<u8>> {
        let templates = self.templates.read().map_err(Self::poisoned)?;
        templates
            .get(name)
            .map(|s| s.bytes.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn put(&self, name: &TemplateName, bytes: Vec<u8>) -> Result<TemplateMeta> {
        validate_template(name, &bytes)?;
        let meta = TemplateMeta::now(name.clone(), bytes.len());
        let mut templates = self.templates.write().map_err(Self::poisoned)?;
        templates.insert(
            name.clone(),
            Stored {
                bytes,
                meta: meta.clone(),
            },
        );
        log::debug!("Stored template {name} in memory");
        Ok(meta)
    }

    async fn delete(&self, name: &TemplateName) -> Result<()> {
        let mut templates = self.templates.write().map_err(Self::poisoned)?;
        templates
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}
