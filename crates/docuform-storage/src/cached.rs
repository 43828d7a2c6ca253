//! A remote store mirrored into a local directory.

use std::sync::Arc;

use async_trait::async_trait;
use docuform_core::TemplateName;

use crate::fs::FsTemplateStore;
use crate::store::{TemplateMeta, TemplateStore};
use crate::{Error, Result};

/// Wraps a remote store with a local [`FsTemplateStore`] mirror.
///
/// - `get` serves from the mirror and fills it on a miss.
/// - `put` and `delete` go to the remote first, then the mirror.
/// - `list` asks the remote and drops mirrored copies that are gone or
///   older than the remote object. When the remote is unreachable the
///   mirror's own listing is returned instead.
pub struct CachedTemplateStore {
    remote: Arc<dyn TemplateStore>,
    cache: FsTemplateStore,
}

impl std::fmt::Debug for CachedTemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTemplateStore")
            .field("remote", &self.remote.backend())
            .field("cache", &self.cache.root())
            .finish()
    }
}

impl CachedTemplateStore {
    /// Mirror `remote` into `cache`.
    pub fn new(remote: Arc<dyn TemplateStore>, cache: FsTemplateStore) -> Self {
        Self { remote, cache }
    }

    /// The local mirror.
    pub fn cache(&self) -> &FsTemplateStore {
        &self.cache
    }

    /// Remove mirrored templates that no longer match the remote listing.
    async fn reconcile(&self, remote: &[TemplateMeta]) -> Result<()> {
        for cached in self.cache.list().await? {
            let stale = match remote.iter().find(|r| r.name == cached.name) {
                None => true,
                Some(current) => match (current.updated, cached.updated) {
                    (Some(remote_time), Some(cached_time)) => remote_time > cached_time,
                    _ => current.size != cached.size,
                },
            };
            if stale {
                log::debug!("Dropping stale cached template {}", cached.name);
                if let Err(e) = self.cache.delete(&cached.name).await {
                    if !e.is_not_found() {
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for CachedTemplateStore {
    fn backend(&self) -> &'static str {
        self.remote.backend()
    }

    async fn list(&self) -> Result<Vec<TemplateMeta>> {
        match self.remote.list().await {
            Ok(templates) => {
                if let Err(e) = self.reconcile(&templates).await {
                    log::warn!("Failed to reconcile template cache: {e}");
                }
                Ok(templates)
            }
            Err(e) if e.is_upstream() => {
                log::warn!("Remote template listing failed, serving cached list: {e}");
                self.cache.list().await
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, name: &TemplateName) -> Result<Vec<u8>> {
        match self.cache.get(name).await {
            Ok(bytes) => {
                log::debug!("Template cache hit: {name}");
                return Ok(bytes);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => log::warn!("Template cache read failed for {name}: {e}"),
        }

        let bytes = self.remote.get(name).await?;
        if let Err(e) = self.cache.put(name, bytes.clone()).await {
            log::warn!("Failed to cache template {name}: {e}");
        }
        Ok(bytes)
    }

    async fn put(&self, name: &TemplateName, bytes: Vec<u8>) -> Result<TemplateMeta> {
        let meta = self.remote.put(name, bytes.clone()).await?;
        if let Err(e) = self.cache.put(name, bytes).await {
            log::warn!("Failed to cache template {name}: {e}");
        }
        Ok(meta)
    }

    async fn delete(&self, name: &TemplateName) -> Result<()> {
        // The mirror is only dropped once the remote copy is gone, so a
        // failed delete leaves the cache serving what the remote still has.
        let remote = self.remote.delete(name).await;
        if matches!(&remote, Err(e) if !e.is_not_found()) {
            return remote;
        }
        let cached = self.cache.delete(name).await;
        match (remote, cached) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => {
                if !e.is_not_found() {
                    log::warn!("Failed to evict cached template {name}: {e}");
                }
                Ok(())
            }
            // Gone remotely but still mirrored: the delete did something.
            (Err(_), Ok(())) => Ok(()),
            (Err(_), Err(_)) => Err(Error::NotFound(name.to_string())),
        }
    }
}
