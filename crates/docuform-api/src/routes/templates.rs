//! Template management, field discovery, rendering and pre-fill.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use docuform_core::{ServiceState, TemplateName};
use docuform_docx::{
    DOCX_CONTENT_TYPE, DocxPackage, FieldKind, PDF_CONTENT_TYPE, TemplateField, discover_fields,
    html_to_docx, render,
};
use docuform_records::StudentRecord;
use docuform_storage::TemplateMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::blocking;
use crate::state::AppState;
use crate::{Error, Result};

// ============================================================================
// Response types
// ============================================================================

/// One entry of the template listing.
#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    /// Name, size and modification time.
    #[serde(flatten)]
    pub meta: TemplateMeta,
    /// Name without the `.docx` extension.
    pub display_name: String,
}

impl From<TemplateMeta> for TemplateSummary {
    fn from(meta: TemplateMeta) -> Self {
        Self {
            display_name: meta.name.display_name().to_string(),
            meta,
        }
    }
}

/// `GET /api/templates` response.
#[derive(Debug, Serialize)]
pub struct TemplateList {
    /// Templates sorted by name.
    pub templates: Vec<TemplateSummary>,
}

/// `GET /api/templates/{name}/fields` response.
#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    /// Template name.
    pub template: TemplateName,
    /// Fields in order of first appearance.
    pub fields: Vec<TemplateField>,
}

/// `GET /api/templates/{name}/prefill/{student_id}` response.
#[derive(Debug, Serialize)]
pub struct PrefillResponse {
    /// Template name.
    pub template: TemplateName,
    /// The matched student.
    pub student: StudentRecord,
    /// Values for the template's text fields that the record could supply.
    pub values: BTreeMap<String, String>,
}

/// Output format of a render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word document.
    #[default]
    Docx,
    /// PDF through the configured converter.
    Pdf,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Docx => DOCX_CONTENT_TYPE,
            OutputFormat::Pdf => PDF_CONTENT_TYPE,
        }
    }
}

/// `POST /api/templates/{name}/render` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    /// Field values; a JSON object.
    pub values: Value,
    /// Output format.
    pub format: OutputFormat,
    /// Download file name; the extension is added when missing.
    pub filename: Option<String>,
    /// Label appended to the template name when `filename` is absent,
    /// e.g. the student's name.
    pub label: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

fn parse_name(raw: &str) -> Result<TemplateName> {
    Ok(TemplateName::parse(raw)?)
}

/// `GET /api/templates`
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<TemplateList>> {
    let listed = state.store.list().await;
    let service = &state.templates_service;
    match &listed {
        Ok(_) if !service.state().is_ready() => service.set_state(ServiceState::Ready),
        Err(e) if e.is_upstream() => {
            let degraded = ServiceState::Degraded(e.to_string());
            if service.state() != degraded {
                service.set_state(degraded);
            }
        }
        _ => {}
    }
    let templates = listed?.into_iter().map(TemplateSummary::from).collect();
    Ok(Json(TemplateList { templates }))
}

/// `GET /api/templates/{name}`
pub async fn download_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let name = parse_name(&name)?;
    let bytes = state.store.get(&name).await?;
    Ok(file_response(bytes, DOCX_CONTENT_TYPE, name.as_str()))
}

/// `PUT /api/templates/{name}` with a DOCX body.
pub async fn upload_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<TemplateSummary>)> {
    let name = parse_name(&name)?;
    if body.is_empty() {
        return Err(Error::BadRequest("request body is empty".into()));
    }
    let meta = state.store.put(&name, body.to_vec()).await?;
    tracing::info!(template = %name, size = meta.size, "Template uploaded");
    Ok((StatusCode::CREATED, Json(meta.into())))
}

/// `POST /api/templates/{name}/html` with an HTML body.
pub async fn save_html_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    html: String,
) -> Result<(StatusCode, Json<TemplateSummary>)> {
    let name = parse_name(&name)?;
    if html.trim().is_empty() {
        return Err(Error::BadRequest("request body is empty".into()));
    }
    let bytes = html_to_docx(&html)?.to_bytes()?;
    let meta = state.store.put(&name, bytes).await?;
    tracing::info!(template = %name, size = meta.size, "Template saved from HTML");
    Ok((StatusCode::CREATED, Json(meta.into())))
}

/// `DELETE /api/templates/{name}`
pub async fn delete_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    let name = parse_name(&name)?;
    state.store.delete(&name).await?;
    tracing::info!(template = %name, "Template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/templates/{name}/fields`
pub async fn template_fields(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FieldsResponse>> {
    let name = parse_name(&name)?;
    let fields = load_fields(&state, &name).await?;
    Ok(Json(FieldsResponse {
        template: name,
        fields,
    }))
}

/// `POST /api/templates/{name}/render`
pub async fn render_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: std::result::Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Response> {
    let name = parse_name(&name)?;
    let Json(request) = request?;
    let values = match request.values {
        Value::Null => Value::Object(Default::default()),
        values @ Value::Object(_) => values,
        _ => return Err(Error::BadRequest("values must be a JSON object".into())),
    };

    let bytes = state.store.get(&name).await?;
    let options = state.render.clone();
    let docx = blocking(move || {
        let package = DocxPackage::from_bytes(&bytes)?;
        Ok(render(&package, &values, &options)?.to_bytes()?)
    })
    .await?;

    let format = request.format;
    let body = match format {
        OutputFormat::Docx => docx,
        OutputFormat::Pdf => {
            let converter = state.converter.as_ref().ok_or_else(|| {
                docuform_docx::TemplateError::ConverterUnavailable(
                    "PDF output is disabled on this server".into(),
                )
            })?;
            converter.to_pdf(&docx).await?
        }
    };

    let file_name = output_file_name(
        &name,
        request.filename.as_deref(),
        request.label.as_deref(),
        format.extension(),
    );
    tracing::info!(template = %name, file = %file_name, size = body.len(), "Rendered");
    Ok(file_response(body, format.content_type(), &file_name))
}

/// `GET /api/templates/{name}/prefill/{student_id}`
pub async fn prefill_template(
    State(state): State<AppState>,
    Path((name, student_id)): Path<(String, String)>,
) -> Result<Json<PrefillResponse>> {
    let name = parse_name(&name)?;
    let records = state
        .records
        .clone()
        .ok_or(docuform_records::Error::NotConfigured)?;

    let fields = load_fields(&state, &name).await?;
    let text_fields: Vec<&str> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Text)
        .map(|f| f.name.as_str())
        .collect();

    let student = records.lookup(&student_id).await?;
    let values = docuform_records::prefill(
        text_fields.iter().copied(),
        &student,
        &records.settings().field_map,
    );
    Ok(Json(PrefillResponse {
        template: name,
        student,
        values,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_fields(state: &AppState, name: &TemplateName) -> Result<Vec<TemplateField>> {
    let bytes = state.store.get(name).await?;
    let delimiters = state.render.delimiters.clone();
    blocking(move || {
        let package = DocxPackage::from_bytes(&bytes)?;
        Ok(discover_fields(&package, &delimiters)?)
    })
    .await
}

/// File name for a rendered download.
///
/// An explicit `filename` wins (path separators and control characters are
/// replaced, the extension is added when missing); otherwise the template's
/// display name is used, with `label` in parentheses.
pub fn output_file_name(
    template: &TemplateName,
    filename: Option<&str>,
    label: Option<&str>,
    extension: &str,
) -> String {
    let cleaned = filename.map(|f| {
        f.trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect::<String>()
    });
    match cleaned.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => {
            let suffix = format!(".{extension}");
            let base = strip_suffix_ignore_case(f, &suffix)
                .or_else(|| strip_suffix_ignore_case(f, ".docx"))
                .unwrap_or(f);
            format!("{base}{suffix}")
        }
        None => template.rendered_file_name(label, extension),
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) || !s[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    Some(&s[..split])
}

/// An attachment response.
fn file_response(body: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&content_disposition(file_name)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
