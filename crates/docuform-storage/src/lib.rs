//! Template storage backends for Docuform.
//!
//! Provides:
//! - [`TemplateStore`]: async trait every backend implements
//! - [`FsTemplateStore`]: a local directory of `.docx` files
//! - [`MemoryTemplateStore`]: in-process storage
//! - [`GcsTemplateStore`]: a Google Cloud Storage bucket
//! - [`CachedTemplateStore`]: a remote store mirrored locally
//! - [`open_store`]: builds the configured backend

#![doc = include_str!("../README.md")]

pub mod cached;
pub mod error;
pub mod fs;
pub mod gcs;
pub mod memory;
pub mod store;

use std::sync::Arc;

use docuform_core::config::{StorageBackend, StorageConfig};

pub use cached::CachedTemplateStore;
pub use error::{Error, Result};
pub use fs::FsTemplateStore;
pub use gcs::{GcsTemplateStore, TokenSource};
pub use memory::MemoryTemplateStore;
pub use store::{TemplateMeta, TemplateStore, validate_template};

/// Build the template store described by `config`.
///
/// For the `gcs` backend, `token` selects a static token; otherwise an
/// `endpoint` override implies an unauthenticated emulator and the default
/// endpoint uses the metadata server. A `cache_dir` wraps the remote store
/// in a [`CachedTemplateStore`].
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn TemplateStore>> {
    let store: Arc<dyn TemplateStore> = match config.backend {
        StorageBackend::Fs => {
            log::info!("Using template directory {}", config.dir.display());
            return Ok(Arc::new(FsTemplateStore::new(&config.dir)));
        }
        StorageBackend::Memory => {
            log::info!("Using in-memory template store");
            return Ok(Arc::new(MemoryTemplateStore::new()));
        }
        StorageBackend::Gcs => {
            let bucket = config.bucket.as_deref().ok_or_else(|| {
                docuform_core::Error::config("storage.bucket is required for the gcs backend")
            })?;
            let tokens = match (&config.token, &config.endpoint) {
                (Some(token), _) => TokenSource::Static(token.clone()),
                (None, Some(_)) => TokenSource::Anonymous,
                (None, None) => TokenSource::metadata(),
            };
            let endpoint = config.endpoint.as_deref().unwrap_or(gcs::DEFAULT_ENDPOINT);
            log::info!("Using GCS bucket gs://{bucket}/{} via {endpoint}", config.prefix);
            Arc::new(GcsTemplateStore::with_endpoint(
                endpoint,
                bucket,
                config.prefix.clone(),
                tokens,
            )?)
        }
    };

    Ok(match &config.cache_dir {
        Some(dir) => {
            log::info!("Mirroring templates into {}", dir.display());
            Arc::new(CachedTemplateStore::new(store, FsTemplateStore::new(dir)))
        }
        None => store,
    })
}
