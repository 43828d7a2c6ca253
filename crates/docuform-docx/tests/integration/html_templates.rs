//! Templates authored as HTML.

use docuform_docx::{DOCUMENT_PART, RenderOptions, Template, html_to_docx};
use serde_json::json;

use crate::common::part_text;

#[test]
fn test_html_template_round_trip() {
    let html = r#"
        <h1>Enrollment Letter</h1>
        <p>Dear <b>{guardian_name}</b>,</p>
        <p>We are pleased to confirm that {student_name} is enrolled in:</p>
        <ul>{#courses}<li>{title}</li>{/courses}</ul>
    "#;
    let bytes = html_to_docx(html).unwrap().to_bytes().unwrap();

    let template = Template::from_bytes(&bytes).unwrap();
    let names: Vec<String> = template.fields().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["guardian_name", "student_name", "courses"]);

    let rendered = template
        .render(
            &json!({
                "guardian_name": "Mr. Diaz",
                "student_name": "Luz",
                "courses": [{"title": "Biology"}, {"title": "Chemistry"}]
            }),
            &RenderOptions::default(),
        )
        .unwrap();
    let text = part_text(&rendered, DOCUMENT_PART);
    assert!(text.starts_with("Enrollment Letter\nDear Mr. Diaz,"));
    assert!(text.contains("Luz is enrolled in:"));
    assert!(text.contains("Biology"));
    assert!(text.contains("Chemistry"));
}
