//! Shared fixtures: an in-memory server with a roster and a fake converter.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use docuform_api::{AppState, router};
use docuform_core::TemplateName;
use docuform_core::config::RecordsSettings;
use docuform_docx::{DOCUMENT_PART, DocxPackage, PdfConverter, html_to_docx};
use docuform_records::RecordDirectory;
use docuform_storage::{MemoryTemplateStore, TemplateStore};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TOKEN: &str = "test-admin-token";

pub const LETTER_HTML: &str = "<p>Dear {guardian_name},</p>\
    <p>{student_name} is enrolled in grade {grade}.</p>\
    <p>{#courses}{title}; {/courses}</p>";

pub const ROSTER_CSV: &str = "Student ID,Student Name,Grade,Guardian\n\
    1001,Ana Lima,10,Rosa Lima\n\
    1002,Bo Chen,11,Wei Chen\n";

/// Pretends to convert by prefixing a PDF header.
pub struct FakePdf;

#[async_trait]
impl PdfConverter for FakePdf {
    async fn to_pdf(&self, docx: &[u8]) -> docuform_docx::Result<Vec<u8>> {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend_from_slice(&docx[..docx.len().min(16)]);
        Ok(pdf)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryTemplateStore>,
    _dir: TempDir,
}

pub fn docx_from_html(html: &str) -> Vec<u8> {
    html_to_docx(html).unwrap().to_bytes().unwrap()
}

pub fn document_xml(bytes: &[u8]) -> String {
    DocxPackage::from_bytes(bytes)
        .unwrap()
        .part(DOCUMENT_PART)
        .unwrap()
        .to_string()
}

/// A server with `Letter.docx`, a two-student roster, a fake PDF converter
/// and auth enabled.
pub async fn app() -> TestApp {
    let store = Arc::new(MemoryTemplateStore::new());
    store
        .put(
            &TemplateName::parse("Letter.docx").unwrap(),
            docx_from_html(LETTER_HTML),
        )
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let roster = dir.path().join("roster.csv");
    std::fs::write(&roster, ROSTER_CSV).unwrap();
    let mut settings = RecordsSettings {
        path: Some(roster),
        name_column: "Student Name".into(),
        ..RecordsSettings::default()
    };
    settings
        .field_map
        .insert("guardian_name".into(), "Guardian".into());
    let records = RecordDirectory::from_settings(&settings).unwrap();

    let state = AppState::new(store.clone())
        .with_records(Arc::new(records))
        .with_converter(Arc::new(FakePdf))
        .with_auth_token(TOKEN);

    TestApp {
        router: router(state),
        store,
        _dir: dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn error_category(&self) -> String {
        self.json()["error"]["category"].as_str().unwrap().to_string()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> TestResponse {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub fn with_body(method: Method, uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}
