//! Templates shaped like Word output.

use docuform_docx::{
    DOCUMENT_PART, Delimiters, DocxPackage, FieldKind, RenderOptions, Template, discover_fields,
    render_bytes,
};
use serde_json::{Value, json};

use crate::common::{IMAGE_BYTES, part_text, progress_report_docx, zip_parts};

fn report_values() -> Value {
    json!({
        "guardian_name": "Ms. Ortiz",
        "student_name": "Ana Lima",
        "student_id": "S-100",
        "courses": [
            {"title": "Math", "grade": "A"},
            {"title": "Art", "grade": "B+"}
        ],
        "notes": "Great term\nKeep reading",
        "school": "Central High",
        "term": "Fall"
    })
}

#[test]
fn test_discover_fields_across_parts() {
    let package = DocxPackage::from_bytes(&progress_report_docx()).unwrap();
    let fields = discover_fields(&package, &Delimiters::default()).unwrap();

    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "guardian_name",
            "student_name",
            "student_id",
            "courses",
            "notes",
            "school",
            "term"
        ]
    );

    let courses = &fields[3];
    assert_eq!(courses.kind, FieldKind::Section);
    let children: Vec<&str> = courses.children.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(children, vec!["title", "grade"]);
}

#[test]
fn test_render_full_report() {
    let bytes = render_bytes(&progress_report_docx(), &report_values(), &RenderOptions::default())
        .unwrap();
    let rendered = DocxPackage::from_bytes(&bytes).unwrap();

    let text = part_text(&rendered, DOCUMENT_PART);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Progress Report");
    assert_eq!(lines[1], "Dear Ms. Ortiz,");
    assert_eq!(lines[2], "This report covers Ana Lima (ID S-100).");
    assert_eq!(lines[3], "Math: A");
    assert_eq!(lines[4], "Art: B+");
    assert_eq!(lines[5], "");
    assert_eq!(lines[6], "Notes: Great termKeep reading");

    let xml = rendered.part(DOCUMENT_PART).unwrap();
    assert!(xml.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">,</w:t>"#));
    assert!(xml.contains(r#"<w:rPr><w:i/></w:rPr><w:t xml:space="preserve">Ana Lima</w:t>"#));
    assert!(xml.contains(r#"Great term</w:t><w:br/><w:t xml:space="preserve">Keep reading"#));
    assert!(!xml.contains("{#courses}"));

    assert_eq!(part_text(&rendered, "word/header1.xml"), "Central High | Fall");
}

#[test]
fn test_render_preserves_package_layout() {
    let original_bytes = progress_report_docx();
    let original = DocxPackage::from_bytes(&original_bytes).unwrap();
    let rendered = DocxPackage::from_bytes(
        &render_bytes(&original_bytes, &report_values(), &RenderOptions::default()).unwrap(),
    )
    .unwrap();

    let before: Vec<&str> = original.entry_names().collect();
    let after: Vec<&str> = rendered.entry_names().collect();
    assert_eq!(before, after);
    assert_eq!(rendered.raw("word/media/image1.png").unwrap(), IMAGE_BYTES);
    assert_eq!(
        rendered.raw("word/footer1.xml").unwrap(),
        original.raw("word/footer1.xml").unwrap()
    );
}

#[test]
fn test_render_without_courses() {
    let template = Template::from_bytes(&progress_report_docx()).unwrap();
    let rendered = template
        .render(&json!({"student_name": "Bo", "courses": []}), &RenderOptions::default())
        .unwrap();

    let text = part_text(&rendered, DOCUMENT_PART);
    assert!(text.contains("No courses recorded."));
    assert!(!text.contains("Math"));
    assert!(text.contains("Dear ,"));

    let xml = rendered.part(DOCUMENT_PART).unwrap();
    assert!(xml.contains(r#"<w:tcW w:w="9000" w:type="dxa"/></w:tcPr><w:p/></w:tc>"#));
}

#[test]
fn test_template_reused_for_several_students() {
    let template = Template::from_bytes(&progress_report_docx()).unwrap();
    for name in ["Ana", "Bo", "Cy"] {
        let rendered = template
            .render(&json!({ "student_name": name }), &RenderOptions::default())
            .unwrap();
        let text = part_text(&rendered, DOCUMENT_PART);
        assert!(text.contains(&format!("This report covers {name} (ID ).")));
    }
}

#[test]
fn test_syntax_error_names_the_part() {
    let header = r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>{#courses}{title}</w:t></w:r></w:p></w:hdr>"#;
    let document = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#;
    let bytes = zip_parts(&[
        (DOCUMENT_PART, document.as_bytes()),
        ("word/header1.xml", header.as_bytes()),
    ]);

    let err = Template::from_bytes(&bytes).unwrap_err();
    assert!(err.is_template_syntax());
    assert!(err.to_string().contains("word/header1.xml"));
    assert!(err.to_string().contains("courses"));
}

#[test]
fn test_non_docx_input_rejected() {
    let err = Template::from_bytes(b"plain text, not a zip").unwrap_err();
    assert!(err.is_invalid_package());

    let bytes = zip_parts(&[("hello.txt", b"hi".as_slice())]);
    let err = Template::from_bytes(&bytes).unwrap_err();
    assert!(err.is_invalid_package());
}
