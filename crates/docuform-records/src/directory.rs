//! Cached, indexed access to student records.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use docuform_core::config::RecordsSettings;
use docuform_core::{ServiceHandle, ServiceState};

use crate::record::{RecordTable, StudentRecord, prefill};
use crate::source::{RecordSource, source_from_settings};
use crate::{Error, Result};

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

struct Snapshot {
    table: Arc<RecordTable>,
    fetched_at: Instant,
}

/// Student records fetched from a [`RecordSource`] and kept for a TTL.
///
/// Reads use the cached table while it is fresh. Once it expires the next
/// read refetches; if that fails and an older table exists, the old table
/// keeps being served and the service is marked degraded.
pub struct RecordDirectory {
    source: Box<dyn RecordSource>,
    settings: RecordsSettings,
    ttl: Duration,
    cached: RwLock<Option<Snapshot>>,
    reload: tokio::sync::Mutex<()>,
    service: ServiceHandle,
}

impl std::fmt::Debug for RecordDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDirectory")
            .field("source", &self.source.describe())
            .field("ttl", &self.ttl)
            .field("state", &self.service.state())
            .finish()
    }
}

impl RecordDirectory {
    /// Create a directory over `source`. Nothing is fetched until first use.
    pub fn new(source: Box<dyn RecordSource>, settings: RecordsSettings) -> Self {
        Self {
            source,
            ttl: Duration::from_secs(settings.cache_ttl_secs),
            settings,
            cached: RwLock::new(None),
            reload: tokio::sync::Mutex::new(()),
            service: ServiceHandle::new("records"),
        }
    }

    /// Create a directory from configuration.
    ///
    /// Returns [`Error::NotConfigured`] when neither `path` nor `url` is set.
    pub fn from_settings(settings: &RecordsSettings) -> Result<Self> {
        let source = source_from_settings(settings)?;
        log::info!("Student records from {}", source.describe());
        Ok(Self::new(source, settings.clone()))
    }

    /// Lifecycle handle reported by the health endpoint.
    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    /// Settings in effect.
    pub fn settings(&self) -> &RecordsSettings {
        &self.settings
    }

    /// Record with the given id (trimmed, case-insensitive).
    pub async fn lookup(&self, id: &str) -> Result<StudentRecord> {
        let table = self.table().await?;
        table
            .get(id)
            .cloned()
            .ok_or_else(|| docuform_core::Error::not_found("student", id.trim()).into())
    }

    /// Up to `limit` records whose name contains `query`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<StudentRecord>> {
        let table = self.table().await?;
        Ok(table
            .search(query, &self.settings.name_column, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Pre-filled values for `fields` from the record with `id`, using the
    /// configured field map.
    pub async fn prefill<'a, I>(&self, id: &str, fields: I) -> Result<BTreeMap<String, String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let record = self.lookup(id).await?;
        Ok(prefill(fields, &record, &self.settings.field_map))
    }

    /// Refetch now, ignoring the TTL. Returns the number of records loaded.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.reload.lock().await;
        Ok(self.reload_locked().await?.len())
    }

    /// Current table, refetched when missing or expired.
    async fn table(&self) -> Result<Arc<RecordTable>> {
        if let Some(table) = self.fresh()? {
            return Ok(table);
        }

        let _guard = self.reload.lock().await;
        // Another caller may have reloaded while we waited.
        if let Some(table) = self.fresh()? {
            return Ok(table);
        }

        match self.reload_locked().await {
            Ok(table) => Ok(table),
            Err(e) => match self.stale()? {
                Some(table) => {
                    log::warn!("Record refresh failed, serving cached records: {e}");
                    self.mark(ServiceState::Degraded(e.to_string()));
                    Ok(table)
                }
                None => Err(e),
            },
        }
    }

    fn fresh(&self) -> Result<Option<Arc<RecordTable>>> {
        let cached = self
            .cached
            .read()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(cached
            .as_ref()
            .filter(|snapshot| snapshot.fetched_at.elapsed() < self.ttl)
            .map(|snapshot| Arc::clone(&snapshot.table)))
    }

    fn stale(&self) -> Result<Option<Arc<RecordTable>>> {
        let cached = self
            .cached
            .read()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(cached.as_ref().map(|snapshot| Arc::clone(&snapshot.table)))
    }

    async fn reload_locked(&self) -> Result<Arc<RecordTable>> {
        if self.service.state() == ServiceState::Stopped {
            self.mark(ServiceState::Starting);
        }

        let loaded = async {
            let bytes = self.source.fetch().await?;
            RecordTable::from_csv(&bytes, &self.settings.id_column)
        }
        .await;

        let table = match loaded {
            Ok(table) => Arc::new(table),
            Err(e) => {
                if self.stale()?.is_none() {
                    self.mark(ServiceState::Failed(e.to_string()));
                }
                return Err(e);
            }
        };

        log::info!(
            "Loaded {} student records from {}",
            table.len(),
            self.source.describe()
        );
        let mut cached = self
            .cached
            .write()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        *cached = Some(Snapshot {
            table: Arc::clone(&table),
            fetched_at: Instant::now(),
        });
        drop(cached);
        self.mark(ServiceState::Ready);
        Ok(table)
    }

    fn mark(&self, state: ServiceState) {
        if self.service.state() != state {
            self.service.set_state(state);
        }
    }
}
