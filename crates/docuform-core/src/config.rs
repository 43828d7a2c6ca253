//! Configuration for Docuform.
//!
//! Configuration is a TOML file resolved through [`ConfigManager`]:
//!
//! 1. An explicit path (`--config`)
//! 2. The `DOCUFORM_CONFIG` environment variable
//! 3. `<platform config dir>/docuform/config.toml`
//!
//! A missing file yields defaults. `DOCUFORM_*` environment variables are
//! applied on top of whatever was loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix shared by every Docuform environment variable.
pub const ENV_PREFIX: &str = "DOCUFORM";

// ============================================================================
// ConfigManager
// ============================================================================

/// Loading, locating, and exporting a project's configuration.
pub trait ConfigManager: Default + Serialize + DeserializeOwned {
    /// Project name, used for the config directory and CLI hints.
    fn project_name() -> &'static str;

    /// Environment variables equivalent to this configuration.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>>;

    /// Apply `KEY=value` overrides (normally the process environment).
    fn apply_env_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Default config file location for this platform.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::project_name()).join("config.toml"))
    }

    /// Resolve the config file path from an explicit path, the environment,
    /// or the platform default.
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        let env_var = format!("{}_CONFIG", env_prefix(Self::project_name()));
        if let Ok(path) = std::env::var(&env_var) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::default_config_path()
    }

    /// Parse a config file; a missing file yields defaults.
    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Load configuration and apply environment overrides.
    fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                Self::load_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

/// Convert a project name into an environment variable prefix
/// (`"docuform"` → `"DOCUFORM"`, `"my-app"` → `"MY_APP"`).
pub fn env_prefix(project_name: &str) -> String {
    project_name.to_uppercase().replace(['-', ' '], "_")
}

// ============================================================================
// DocuformConfig
// ============================================================================

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocuformConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Where templates live.
    pub storage: StorageConfig,
    /// Student record source.
    pub records: RecordsSettings,
    /// Rendering and PDF conversion.
    pub render: RenderConfig,
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Bearer token for template management routes; `None` disables auth.
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            auth_token: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Template storage backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local directory.
    #[default]
    Fs,
    /// In-process memory (lost on restart).
    Memory,
    /// Google Cloud Storage bucket.
    Gcs,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "file" | "local" => Ok(Self::Fs),
            "memory" | "mem" => Ok(Self::Memory),
            "gcs" => Ok(Self::Gcs),
            other => Err(Error::config(format!(
                "unknown storage backend '{other}' (expected fs, memory, or gcs)"
            ))),
        }
    }
}

/// Template storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: StorageBackend,
    /// Template directory for the `fs` backend.
    pub dir: PathBuf,
    /// Bucket for the `gcs` backend.
    pub bucket: Option<String>,
    /// Object prefix inside the bucket.
    pub prefix: String,
    /// Override for the GCS endpoint (emulators, tests).
    pub endpoint: Option<String>,
    /// Static OAuth access token; when unset the metadata server is used.
    pub token: Option<String>,
    /// Local mirror of remote templates; unset disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            dir: PathBuf::from("templates"),
            bucket: None,
            prefix: "templates/".to_string(),
            endpoint: None,
            token: None,
            cache_dir: None,
        }
    }
}

/// Student record source settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsSettings {
    /// Local CSV file.
    pub path: Option<PathBuf>,
    /// CSV export URL (takes precedence over `path`).
    pub url: Option<String>,
    /// Column holding the student id.
    pub id_column: String,
    /// Column used for name search.
    pub name_column: String,
    /// How long fetched records stay fresh.
    pub cache_ttl_secs: u64,
    /// Template field → column overrides.
    pub field_map: BTreeMap<String, String>,
}

impl Default for RecordsSettings {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            id_column: "Student ID".to_string(),
            name_column: "Name".to_string(),
            cache_ttl_secs: 300,
            field_map: BTreeMap::new(),
        }
    }
}

impl RecordsSettings {
    /// Whether any record source is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.path.is_some()
    }
}

/// Rendering settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Turn `\n` in values into Word line breaks.
    pub linebreaks: bool,
    /// LibreOffice executable used for PDF conversion.
    pub soffice_path: String,
    /// Upper bound on a single PDF conversion.
    pub pdf_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            linebreaks: true,
            soffice_path: "soffice".to_string(),
            pdf_timeout_secs: 60,
        }
    }
}

impl ConfigManager for DocuformConfig {
    fn project_name() -> &'static str {
        "docuform"
    }

    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let mut vars = vec![
            env("SERVER_HOST", &self.server.host),
            env("SERVER_PORT", self.server.port),
            env("STORAGE_BACKEND", self.storage.backend.as_str()),
            env("STORAGE_DIR", self.storage.dir.display()),
            env("STORAGE_PREFIX", &self.storage.prefix),
            env("RECORDS_ID_COLUMN", &self.records.id_column),
            env("RECORDS_NAME_COLUMN", &self.records.name_column),
            env("RECORDS_CACHE_TTL_SECS", self.records.cache_ttl_secs),
            env("RENDER_LINEBREAKS", self.render.linebreaks),
            env("RENDER_SOFFICE_PATH", &self.render.soffice_path),
            env("RENDER_PDF_TIMEOUT_SECS", self.render.pdf_timeout_secs),
        ];
        let optional = [
            ("SERVER_AUTH_TOKEN", self.server.auth_token.clone()),
            ("STORAGE_BUCKET", self.storage.bucket.clone()),
            ("STORAGE_ENDPOINT", self.storage.endpoint.clone()),
            ("STORAGE_TOKEN", self.storage.token.clone()),
            (
                "STORAGE_CACHE_DIR",
                self.storage.cache_dir.as_ref().map(|p| p.display().to_string()),
            ),
            (
                "RECORDS_PATH",
                self.records.path.as_ref().map(|p| p.display().to_string()),
            ),
            ("RECORDS_URL", self.records.url.clone()),
        ];
        vars.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| env(key, v))),
        );
        Ok(vars)
    }

    fn apply_env_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{ENV_PREFIX}_");
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            match name {
                "SERVER_HOST" => self.server.host = value,
                "SERVER_PORT" => self.server.port = parse_env(&key, &value)?,
                "SERVER_AUTH_TOKEN" => self.server.auth_token = non_empty(value),
                "STORAGE_BACKEND" => self.storage.backend = value.parse()?,
                "STORAGE_DIR" => self.storage.dir = PathBuf::from(value),
                "STORAGE_BUCKET" => self.storage.bucket = non_empty(value),
                "STORAGE_PREFIX" => self.storage.prefix = value,
                "STORAGE_ENDPOINT" => self.storage.endpoint = non_empty(value),
                "STORAGE_TOKEN" => self.storage.token = non_empty(value),
                "STORAGE_CACHE_DIR" => self.storage.cache_dir = non_empty(value).map(PathBuf::from),
                "RECORDS_PATH" => self.records.path = non_empty(value).map(PathBuf::from),
                "RECORDS_URL" => self.records.url = non_empty(value),
                "RECORDS_ID_COLUMN" => self.records.id_column = value,
                "RECORDS_NAME_COLUMN" => self.records.name_column = value,
                "RECORDS_CACHE_TTL_SECS" => {
                    self.records.cache_ttl_secs = parse_env(&key, &value)?;
                }
                "RENDER_LINEBREAKS" => self.render.linebreaks = parse_env(&key, &value)?,
                "RENDER_SOFFICE_PATH" => self.render.soffice_path = value,
                "RENDER_PDF_TIMEOUT_SECS" => {
                    self.render.pdf_timeout_secs = parse_env(&key, &value)?;
                }
                // DOCUFORM_CONFIG and unknown keys are not config fields
                _ => {}
            }
        }
        Ok(())
    }
}

impl StorageBackend {
    /// Lowercase name as used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fs => "fs",
            Self::Memory => "memory",
            Self::Gcs => "gcs",
        }
    }
}

fn env(suffix: &str, value: impl std::fmt::Display) -> (String, String) {
    (format!("{ENV_PREFIX}_{suffix}"), value.to_string())
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid value '{value}' for {key}")))
}

// ============================================================================
// Tests
// ============================================================================
