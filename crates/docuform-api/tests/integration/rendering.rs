//! Field discovery and rendering over HTTP.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use docuform_core::TemplateName;
use docuform_docx::PDF_CONTENT_TYPE;
use docuform_storage::TemplateStore;
use serde_json::json;

use crate::common::{app, docx_from_html, document_xml, get, post_json, send};

#[tokio::test]
async fn test_fields() {
    let app = app().await;
    let resp = get(&app.router, "/api/templates/Letter.docx/fields").await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["template"], "Letter.docx");

    let fields = body["fields"].as_array().unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["guardian_name", "student_name", "grade", "courses"]);
    assert_eq!(fields[3]["kind"], "section");
    assert_eq!(fields[3]["children"][0]["name"], "title");
    assert_eq!(fields[0]["label"], "Guardian Name");
}

#[tokio::test]
async fn test_render_docx() {
    let app = app().await;
    let resp = post_json(
        &app.router,
        "/api/templates/Letter.docx/render",
        json!({
            "values": {
                "guardian_name": "Rosa Lima",
                "student_name": "Ana <Lima>",
                "grade": 10,
                "courses": [{"title": "Biology"}, {"title": "Art"}]
            },
            "label": "Ana Lima"
        }),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    let disposition = resp.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("filename=\"Letter (Ana Lima).docx\""));

    let xml = document_xml(&resp.body);
    assert!(xml.contains("Dear Rosa Lima,"));
    assert!(xml.contains("Ana &lt;Lima&gt; is enrolled in grade 10."));
    assert!(xml.contains("Biology; Art; "));
    assert!(!xml.contains("{"));
}

#[tokio::test]
async fn test_render_pdf_with_filename() {
    let app = app().await;
    let resp = post_json(
        &app.router,
        "/api/templates/Letter.docx/render",
        json!({"values": {}, "format": "pdf", "filename": "letter-ana"}),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers[header::CONTENT_TYPE], PDF_CONTENT_TYPE);
    assert!(resp.body.starts_with(b"%PDF"));
    let disposition = resp.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("filename=\"letter-ana.pdf\""));
}

#[tokio::test]
async fn test_render_errors() {
    let app = app().await;
    let resp = post_json(
        &app.router,
        "/api/templates/Letter.docx/render",
        json!({"values": [1, 2, 3]}),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = post_json(&app.router, "/api/templates/Nope.docx/render", json!({})).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    app.store
        .put(
            &TemplateName::parse("Broken.docx").unwrap(),
            docx_from_html("<p>Dear {name</p>"),
        )
        .await
        .unwrap();
    let resp = post_json(&app.router, "/api/templates/Broken.docx/render", json!({})).await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.error_category(), "template");
    assert!(resp.json()["error"]["message"]
        .as_str()
        .unwrap()
        .contains("word/document.xml"));

    let resp = get(&app.router, "/api/templates/Broken.docx/fields").await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_render_rejects_malformed_body() {
    let app = app().await;
    let uri = "/api/templates/Letter.docx/render";

    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from("{\"values\": {"))
        .unwrap();
    let resp = send(&app.router, request).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_category(), "validation");
    assert!(!resp.json()["error"]["message"].as_str().unwrap().is_empty());

    let resp = post_json(&app.router, uri, json!({"format": "odt"})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_category(), "validation");

    let request = Request::post(uri).body(Body::from("{}")).unwrap();
    let resp = send(&app.router, request).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_category(), "validation");
}
