//! Student search, lookup and template pre-fill.

use std::sync::Arc;

use axum::http::StatusCode;
use docuform_api::{AppState, router};
use docuform_storage::MemoryTemplateStore;

use crate::common::{app, get};

#[tokio::test]
async fn test_search_and_lookup() {
    let app = app().await;
    let resp = get(&app.router, "/api/students?q=chen").await;
    assert_eq!(resp.status, StatusCode::OK);
    let students = resp.json()["students"].as_array().unwrap().clone();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["id"], "1002");

    let resp = get(&app.router, "/api/students?limit=1").await;
    assert_eq!(resp.json()["students"].as_array().unwrap().len(), 1);

    let resp = get(&app.router, "/api/students/1001").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["fields"]["Grade"], "10");

    let resp = get(&app.router, "/api/students/9999").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = get(&app.router, "/api/students?limit=many").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_category(), "validation");
}

#[tokio::test]
async fn test_prefill() {
    let app = app().await;
    let resp = get(&app.router, "/api/templates/Letter.docx/prefill/1001").await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["student"]["id"], "1001");
    assert_eq!(body["values"]["guardian_name"], "Rosa Lima");
    assert_eq!(body["values"]["student_name"], "Ana Lima");
    assert_eq!(body["values"]["grade"], "10");
    // Sections are never pre-filled from a flat record.
    assert!(body["values"].get("courses").is_none());

    let resp = get(&app.router, "/api/templates/Letter.docx/prefill/404").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_records_not_configured() {
    let router = router(AppState::new(Arc::new(MemoryTemplateStore::new())));
    let resp = get(&router, "/api/students?q=ana").await;
    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(resp.error_category(), "unavailable");

    // No token configured: management is open.
    let resp = get(&router, "/api/templates").await;
    assert_eq!(resp.status, StatusCode::OK);
}
