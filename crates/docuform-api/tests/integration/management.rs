//! Listing, upload, download and delete, with and without credentials.

use axum::http::{Method, StatusCode, header};
use docuform_core::TemplateName;
use docuform_docx::DOCX_CONTENT_TYPE;
use docuform_storage::TemplateStore;

use crate::common::{TOKEN, app, docx_from_html, get, send, with_body};

#[tokio::test]
async fn test_health_reports_services() {
    let app = app().await;
    let resp = get(&app.router, "/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["pdf"], "fake");
    let names: Vec<&str> = body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["templates", "records"]);
}

#[tokio::test]
async fn test_list_and_download() {
    let app = app().await;
    let resp = get(&app.router, "/api/templates").await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["templates"][0]["name"], "Letter.docx");
    assert_eq!(body["templates"][0]["display_name"], "Letter");

    let resp = get(&app.router, "/api/templates/Letter.docx").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers[header::CONTENT_TYPE], DOCX_CONTENT_TYPE);
    assert!(resp.body.starts_with(b"PK"));
    let disposition = resp.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"Letter.docx\""));
}

#[tokio::test]
async fn test_missing_and_invalid_names() {
    let app = app().await;
    let resp = get(&app.router, "/api/templates/Missing.docx").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_category(), "not_found");

    let resp = get(&app.router, "/api/templates/notes.txt").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_category(), "validation");
}

#[tokio::test]
async fn test_management_requires_token() {
    let app = app().await;
    let bytes = docx_from_html("<p>{name}</p>");

    let resp = send(
        &app.router,
        with_body(Method::PUT, "/api/templates/New.docx", None, bytes.clone()),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_category(), "authentication");

    let resp = send(
        &app.router,
        with_body(Method::PUT, "/api/templates/New.docx", Some("wrong"), bytes.clone()),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = send(
        &app.router,
        with_body(Method::DELETE, "/api/templates/Letter.docx", None, Vec::new()),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_and_delete_with_token() {
    let app = app().await;
    let resp = send(
        &app.router,
        with_body(
            Method::PUT,
            "/api/templates/Permission%20Slip.docx",
            Some(TOKEN),
            docx_from_html("<p>{name}</p>"),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["name"], "Permission Slip.docx");

    let slip = TemplateName::parse("Permission Slip.docx").unwrap();
    assert!(app.store.exists(&slip).await.unwrap());

    let resp = send(
        &app.router,
        with_body(
            Method::DELETE,
            "/api/templates/Permission%20Slip.docx",
            Some(TOKEN),
            Vec::new(),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert!(!app.store.exists(&slip).await.unwrap());

    let resp = send(
        &app.router,
        with_body(
            Method::DELETE,
            "/api/templates/Permission%20Slip.docx",
            Some(TOKEN),
            Vec::new(),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_non_docx() {
    let app = app().await;
    let resp = send(
        &app.router,
        with_body(
            Method::PUT,
            "/api/templates/Bad.docx",
            Some(TOKEN),
            b"%PDF-1.7 not a word file".to_vec(),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = send(
        &app.router,
        with_body(Method::PUT, "/api/templates/Empty.docx", Some(TOKEN), Vec::new()),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_html_template() {
    let app = app().await;
    let resp = send(
        &app.router,
        with_body(
            Method::POST,
            "/api/templates/Notice.docx/html",
            Some(TOKEN),
            b"<h1>Notice</h1><p>Hello {name}</p>".to_vec(),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let resp = get(&app.router, "/api/templates/Notice.docx/fields").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["fields"][0]["name"], "name");
}
