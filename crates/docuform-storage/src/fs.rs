//! Templates as files in a local directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuform_core::TemplateName;

use crate::store::{TemplateMeta, TemplateStore, sort_by_name, validate_template};
use crate::{Error, Result};

/// Prefix Word uses for lock files next to an open document.
const WORD_LOCK_PREFIX: &str = "~$";

/// A directory of `.docx` files.
///
/// Files that are not valid template names (other extensions, Word lock
/// files, hidden files) are ignored by [`list`](TemplateStore::list).
#[derive(Clone, Debug)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    /// Use `root` as the template directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The template directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &TemplateName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Metadata for one stored template, if present.
    pub async fn meta(&self, name: &TemplateName) -> Result<Option<TemplateMeta>> {
        match tokio::fs::metadata(self.path_for(name)).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(TemplateMeta {
                name: name.clone(),
                size: metadata.len(),
                updated: metadata.modified().ok().map(DateTime::<Utc>::from),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(docuform_core::Error::io_with_path(e, self.path_for(name)).into()),
        }
    }
}

#[async_trait]
impl TemplateStore for FsTemplateStore {
    fn backend(&self) -> &'static str {
        "fs"
    }

    async fn list(&self) -> Result<Vec<TemplateMeta>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Template directory {} does not exist yet", self.root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(docuform_core::Error::io_with_path(e, &self.root).into()),
        };

        let mut templates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') || file_name.starts_with(WORD_LOCK_PREFIX) {
                continue;
            }
            let Ok(name) = TemplateName::parse(file_name) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            templates.push(TemplateMeta {
                name,
                size: metadata.len(),
                updated: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        sort_by_name(&mut templates);
        Ok(templates)
    }

    async fn get(&self, name: &TemplateName) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(docuform_core::Error::io_with_path(e, path).into()),
        }
    }

    async fn put(&self, name: &TemplateName, bytes: Vec<u8>) -> Result<TemplateMeta> {
        validate_template(name, &bytes)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| docuform_core::Error::io_with_path(e, &self.root))?;

        // Write to a short-named temp file beside the target and rename, so
        // readers never see a partial file and long names still fit.
        let path = self.path_for(name);
        let root = self.root.clone();
        let size = bytes.len();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut staging = tempfile::Builder::new()
                .prefix(".partial-")
                .tempfile_in(&root)
                .map_err(|e| docuform_core::Error::io_with_path(e, &root))?;
            staging
                .write_all(&bytes)
                .map_err(|e| docuform_core::Error::io_with_path(e, staging.path()))?;
            staging
                .persist(&path)
                .map_err(|e| docuform_core::Error::io_with_path(e.error, &path))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Unavailable(format!("template write task failed: {e}")))??;

        log::info!("Stored template {name} ({size} bytes) in {}", self.root.display());
        Ok(TemplateMeta::now(name.clone(), size))
    }

    async fn delete(&self, name: &TemplateName) -> Result<()> {
        let path = self.path_for(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted template {name} from {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(docuform_core::Error::io_with_path(e, path).into()),
        }
    }

    async fn exists(&self, name: &TemplateName) -> Result<bool> {
        Ok(self.meta(name).await?.is_some())
    }
}
