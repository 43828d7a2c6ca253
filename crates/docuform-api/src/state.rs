//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use docuform_core::DocuformConfig;
use docuform_core::ServiceHandle;
use docuform_docx::{PdfConverter, RenderOptions, SofficeConverter};
use docuform_records::RecordDirectory;
use docuform_storage::TemplateStore;

use crate::Result;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Where templates live.
    pub store: Arc<dyn TemplateStore>,
    /// Student records, when a source is configured.
    pub records: Option<Arc<RecordDirectory>>,
    /// PDF converter, when enabled.
    pub converter: Option<Arc<dyn PdfConverter>>,
    /// Rendering options applied to every render.
    pub render: RenderOptions,
    /// Bearer token for management routes; `None` disables auth.
    pub auth_token: Option<String>,
    /// Lifecycle of the template store.
    pub templates_service: ServiceHandle,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.backend())
            .field("records", &self.records.is_some())
            .field("converter", &self.converter.as_ref().map(|c| c.name().to_string()))
            .field("render", &self.render)
            .field("auth", &self.auth_token.is_some())
            .finish()
    }
}

impl AppState {
    /// State over `store` with no records, no PDF conversion and auth off.
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self {
            store,
            records: None,
            converter: None,
            render: RenderOptions::default(),
            auth_token: None,
            templates_service: ServiceHandle::new("templates"),
        }
    }

    /// Attach a student record directory.
    pub fn with_records(mut self, records: Arc<RecordDirectory>) -> Self {
        self.records = Some(records);
        self
    }

    /// Attach a PDF converter.
    pub fn with_converter(mut self, converter: Arc<dyn PdfConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Replace the render options.
    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// Require `token` on management routes.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Build the state described by `config`.
    ///
    /// An empty `render.soffice_path` disables PDF output; a `[records]`
    /// section without a source leaves student lookup off.
    pub fn from_config(config: &DocuformConfig) -> Result<Self> {
        let store = docuform_storage::open_store(&config.storage)?;
        let mut state = Self::new(store).with_render_options(RenderOptions {
            linebreaks: config.render.linebreaks,
            ..RenderOptions::default()
        });

        if config.records.is_configured() {
            let records = RecordDirectory::from_settings(&config.records)?;
            state = state.with_records(Arc::new(records));
        } else {
            tracing::info!("No student record source configured; lookup disabled");
        }

        let soffice = config.render.soffice_path.trim();
        if soffice.is_empty() {
            tracing::info!("PDF conversion disabled");
        } else {
            state = state.with_converter(Arc::new(SofficeConverter::new(
                soffice,
                Duration::from_secs(config.render.pdf_timeout_secs),
            )));
        }

        if let Some(token) = config.server.auth_token.as_deref().filter(|t| !t.is_empty()) {
            state = state.with_auth_token(token);
        } else {
            tracing::warn!("server.auth_token is not set; template management is unauthenticated");
        }

        Ok(state)
    }

    /// Service handles reported by `/health`.
    pub fn services(&self) -> Vec<ServiceHandle> {
        let mut services = vec![self.templates_service.clone()];
        if let Some(records) = &self.records {
            services.push(records.service().clone());
        }
        services
    }
}
