//! Where student records come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docuform_core::config::RecordsSettings;

use crate::{Error, Result};

/// A source of CSV bytes with a header row.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the full CSV document.
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable description for logs and health output.
    fn describe(&self) -> String;
}

// ============================================================================
// Local file
// ============================================================================

/// A CSV file on disk, re-read on every fetch.
#[derive(Clone, Debug)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    /// Read records from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for CsvFileSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| docuform_core::Error::io_with_path(e, &self.path).into())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

// ============================================================================
// HTTP export
// ============================================================================

/// A CSV document served over HTTP, such as a published spreadsheet export.
///
/// Google Sheets editor links (`.../spreadsheets/d/<id>/edit#gid=<gid>`) are
/// rewritten to their CSV export URL.
#[derive(Clone, Debug)]
pub struct CsvUrlSource {
    url: String,
    client: reqwest::Client,
}

impl CsvUrlSource {
    /// Fetch records from `url`.
    pub fn new(url: impl AsRef<str>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Fetch records from `url` using an existing client.
    pub fn with_client(url: impl AsRef<str>, client: reqwest::Client) -> Self {
        Self {
            url: export_url(url.as_ref()),
            client,
        }
    }

    /// URL that is actually fetched.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Rewrite a Google Sheets editor URL into its CSV export form. Other URLs
/// are returned unchanged.
pub fn export_url(url: &str) -> String {
    const SHEETS: &str = "docs.google.com/spreadsheets/d/";
    let Some(start) = url.find(SHEETS) else {
        return url.to_string();
    };
    let rest = &url[start + SHEETS.len()..];
    let id_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (id, tail) = rest.split_at(id_end);
    // `/d/e/<published id>/pub...` links are already public CSV or HTML.
    let path = &tail[..tail.find(['?', '#']).unwrap_or(tail.len())];
    if id.is_empty() || id == "e" || path.contains("/export") || path.contains("/pub") {
        return url.to_string();
    }
    let gid = tail
        .split(['#', '&', '?'])
        .find_map(|part| part.strip_prefix("gid="))
        .filter(|gid| !gid.is_empty() && gid.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("0");
    format!(
        "{}{SHEETS}{id}/export?format=csv&gid={gid}",
        &url[..start]
    )
}

#[async_trait]
impl RecordSource for CsvUrlSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        log::debug!("Fetching student records from {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect::<String>();
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: if message.trim().is_empty() {
                    status.canonical_reason().unwrap_or("error").to_string()
                } else {
                    message
                },
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn describe(&self) -> String {
        format!("url {}", self.url)
    }
}

/// Build the source named by `settings`; `url` wins over `path`.
pub fn source_from_settings(settings: &RecordsSettings) -> Result<Box<dyn RecordSource>> {
    match (&settings.url, &settings.path) {
        (Some(url), _) => Ok(Box::new(CsvUrlSource::new(url))),
        (None, Some(path)) => Ok(Box::new(CsvFileSource::new(path))),
        (None, None) => Err(Error::NotConfigured),
    }
}
