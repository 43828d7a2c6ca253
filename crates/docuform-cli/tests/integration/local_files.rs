//! Commands that work on local template files.

use docuform_cli::Error;
use docuform_cli::commands::{fields, from_html, render};
use docuform_docx::TemplateError;

use crate::common::{document_xml, workspace};

#[test]
fn test_fields_tree_and_json() {
    let ws = workspace();

    let tree = fields(&ws.template, false).unwrap();
    let lines: Vec<&str> = tree.lines().collect();
    assert_eq!(lines[0], "guardian_name  (Guardian Name)");
    assert!(tree.contains("courses  (Courses) [section]"));
    assert!(tree.contains("\n  title  (Title)"));

    let json: serde_json::Value = serde_json::from_str(&fields(&ws.template, true).unwrap()).unwrap();
    assert_eq!(json[3]["name"], "courses");
    assert_eq!(json[3]["kind"], "section");
    assert_eq!(json[3]["children"][0]["name"], "title");
}

#[tokio::test]
async fn test_render_layers_student_data_and_set() {
    let ws = workspace();
    let data = ws.path("values.json");
    std::fs::write(
        &data,
        r#"{"grade": "12", "courses": [{"title": "Algebra"}, {"title": "Biology"}]}"#,
    )
    .unwrap();
    let out = ws.path("letter-1001.docx");

    let written = render(
        &ws.config,
        &ws.template,
        Some(&data),
        &["student_name=Ana L.".to_string()],
        Some("1001"),
        &out,
        false,
    )
    .await
    .unwrap();
    assert!(written > 0);

    let xml = document_xml(&out);
    // From the record via the field map.
    assert!(xml.contains("Dear Rosa Lima,"));
    // `--data` overrides the record's grade, `--set` overrides its name.
    assert!(xml.contains("Ana L. is enrolled in grade 12."));
    assert!(xml.contains("Algebra; Biology; "));
}

#[tokio::test]
async fn test_render_unknown_student() {
    let ws = workspace();
    let out = ws.path("nobody.docx");
    let err = render(&ws.config, &ws.template, None, &[], Some("9999"), &out, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Records(ref e) if e.is_not_found()));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_render_data_must_be_object() {
    let ws = workspace();
    let data = ws.path("values.json");
    std::fs::write(&data, "[1, 2]").unwrap();
    let err = render(
        &ws.config,
        &ws.template,
        Some(&data),
        &[],
        None,
        &ws.path("out.docx"),
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
}

#[tokio::test]
async fn test_pdf_output_needs_converter() {
    let ws = workspace();
    let out = ws.path("letter.pdf");
    let err = render(&ws.config, &ws.template, None, &[], None, &out, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Template(TemplateError::ConverterUnavailable(_))
    ));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_from_html_then_render() {
    let ws = workspace();
    let html = ws.path("notice.html");
    std::fs::write(&html, "<h1>Notice</h1><p>Hello {name}</p>").unwrap();
    let template = ws.path("Notice.docx");
    from_html(&html, &template).unwrap();

    let out = ws.path("notice-out.docx");
    render(
        &ws.config,
        &template,
        None,
        &["name=Bo".to_string()],
        None,
        &out,
        false,
    )
    .await
    .unwrap();
    assert!(document_xml(&out).contains("Hello Bo"));
}

#[test]
fn test_from_html_missing_input() {
    let ws = workspace();
    let err = from_html(&ws.path("missing.html"), &ws.path("x.docx")).unwrap_err();
    assert!(matches!(err, Error::Core(_)));
    assert!(err.to_string().contains("missing.html"));
}
