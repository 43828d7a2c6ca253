//! Google Cloud Storage via the JSON API.
//!
//! Objects live under `{prefix}{template name}` in one bucket. Only the
//! four calls the store needs are made: list, media download, media
//! upload, and delete.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuform_core::TemplateName;
use docuform_docx::DOCX_CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::store::{TemplateMeta, TemplateStore, sort_by_name, validate_template};
use crate::{Error, Result};

/// Public GCS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// GCE/Cloud Run metadata server token endpoint.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh metadata tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

/// An access token and when to stop using it.
pub struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Where bearer tokens for GCS come from.
pub enum TokenSource {
    /// No credentials (public buckets, local emulators).
    Anonymous,
    /// A fixed OAuth access token.
    Static(String),
    /// The instance metadata server, with the token cached until shortly
    /// before it expires.
    Metadata {
        /// Token endpoint.
        url: String,
        /// Last fetched token.
        cached: RwLock<Option<CachedToken>>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Anonymous => f.write_str("Anonymous"),
            TokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            TokenSource::Metadata { url, .. } => f.debug_struct("Metadata").field("url", url).finish(),
        }
    }
}

impl TokenSource {
    /// Tokens from the default metadata server.
    pub fn metadata() -> Self {
        Self::metadata_at(METADATA_TOKEN_URL)
    }

    /// Tokens from a metadata server at `url`.
    pub fn metadata_at(url: impl Into<String>) -> Self {
        TokenSource::Metadata {
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    /// A bearer token, or `None` for anonymous access.
    pub async fn token(&self, client: &reqwest::Client) -> Result<Option<String>> {
        match self {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Metadata { url, cached } => {
                if let Some(token) = Self::cached_token(cached) {
                    return Ok(Some(token));
                }
                let fresh = Self::fetch_metadata_token(client, url).await?;
                let token = fresh.access_token.clone();
                let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
                let mut slot = cached
                    .write()
                    .map_err(|e| Error::Auth(format!("token cache poisoned: {e}")))?;
                *slot = Some(CachedToken {
                    token: fresh.access_token,
                    expires_at: Instant::now() + lifetime,
                });
                Ok(Some(token))
            }
        }
    }

    fn cached_token(cached: &RwLock<Option<CachedToken>>) -> Option<String> {
        let slot = cached.read().ok()?;
        let token = slot.as_ref()?;
        (Instant::now() < token.expires_at).then(|| token.token.clone())
    }

    async fn fetch_metadata_token(client: &reqwest::Client, url: &str) -> Result<MetadataToken> {
        let response = client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Auth(format!("metadata server unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "metadata server returned HTTP {}",
                response.status()
            )));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("invalid metadata token response: {e}")))?;
        log::debug!("Fetched GCS access token from metadata server (expires in {}s)", token.expires_in);
        Ok(token)
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    /// GCS reports sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

/// Templates in a GCS bucket.
#[derive(Debug)]
pub struct GcsTemplateStore {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    prefix: String,
    tokens: TokenSource,
}

impl GcsTemplateStore {
    /// A store over `bucket`, with objects named `{prefix}{template}`.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, tokens: TokenSource) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, bucket, prefix, tokens)
    }

    /// Like [`new`](Self::new) but against another endpoint (emulators,
    /// tests).
    pub fn with_endpoint(
        endpoint: &str,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        tokens: TokenSource,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            docuform_core::Error::config(format!("invalid storage endpoint '{endpoint}': {e}"))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(docuform_core::Error::config(format!(
                "storage endpoint '{endpoint}' cannot be a base URL"
            ))
            .into());
        }
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(docuform_core::Error::config("GCS bucket name is empty").into());
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            bucket,
            prefix: prefix.into(),
            tokens,
        })
    }

    fn object_name(&self, name: &TemplateName) -> String {
        format!("{}{}", self.prefix, name.as_str())
    }

    /// `{endpoint}/{segments...}` with each segment percent-encoded, so
    /// object names containing `/` or spaces stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| docuform_core::Error::config("storage endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, name: &TemplateName) -> Result<Url> {
        let object = self.object_name(name);
        self.url(&["storage", "v1", "b", &self.bucket, "o", &object])
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        Ok(match self.tokens.token(&self.client).await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Turn an error status into an error, mapping 404 to `NotFound`.
    async fn check(response: reqwest::Response, name: Option<&TemplateName>) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(name) = name {
                return Err(Error::NotFound(name.to_string()));
            }
        }
        let body = response.text().await.unwrap_or_default();
        let message = upstream_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("GCS returned HTTP {}: {message}", status.as_u16())));
        }
        Err(Error::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    fn meta_from(&self, object: ObjectResource) -> Option<TemplateMeta> {
        let file_name = object.name.strip_prefix(&self.prefix)?;
        let name = TemplateName::parse(file_name).ok()?;
        Some(TemplateMeta {
            name,
            size: object.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            updated: object.updated,
        })
    }
}

/// `{"error": {"message": "..."}}` as returned by Google APIs.
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl TemplateStore for GcsTemplateStore {
    fn backend(&self) -> &'static str {
        "gcs"
    }

    async fn list(&self) -> Result<Vec<TemplateMeta>> {
        let url = self.url(&["storage", "v1", "b", &self.bucket, "o"])?;
        let mut templates = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", self.prefix.clone()), ("delimiter", "/".to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let request = self.authorize(self.client.get(url.clone()).query(&query)).await?;
            let response = Self::check(request.send().await?, None).await?;
            let page: ObjectList = response.json().await?;

            templates.extend(page.items.into_iter().filter_map(|o| self.meta_from(o)));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        sort_by_name(&mut templates);
        log::debug!("Listed {} templates from gs://{}/{}", templates.len(), self.bucket, self.prefix);
        Ok(templates)
    }

    async fn get(&self, name: &TemplateName) -> Result<Vec<u8>> {
        let url = self.object_url(name)?;
        let request = self
            .authorize(self.client.get(url).query(&[("alt", "media")]))
            .await?;
        let response = Self::check(request.send().await?, Some(name)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put(&self, name: &TemplateName, bytes: Vec<u8>) -> Result<TemplateMeta> {
        validate_template(name, &bytes)?;
        let url = self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        let object = self.object_name(name);
        let size = bytes.len();
        let request = self
            .authorize(
                self.client
                    .post(url)
                    .query(&[("uploadType", "media"), ("name", object.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, DOCX_CONTENT_TYPE)
                    .body(bytes),
            )
            .await?;
        let response = Self::check(request.send().await?, None).await?;
        let uploaded: ObjectResource = response.json().await?;

        log::info!("Uploaded template {name} to gs://{}/{object}", self.bucket);
        Ok(self
            .meta_from(uploaded)
            .unwrap_or_else(|| TemplateMeta::now(name.clone(), size)))
    }

    async fn delete(&self, name: &TemplateName) -> Result<()> {
        let url = self.object_url(name)?;
        let request = self.authorize(self.client.delete(url)).await?;
        Self::check(request.send().await?, Some(name)).await?;
        log::info!("Deleted template {name} from gs://{}", self.bucket);
        Ok(())
    }
}
