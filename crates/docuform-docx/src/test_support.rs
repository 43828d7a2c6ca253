//! Builders for small in-memory DOCX packages used across unit tests.

use crate::package::{DOCUMENT_PART, DocxPackage};
use crate::xml::escape_text;

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A package whose main document body is `body`.
#[allow(clippy::unwrap_used)]
pub(crate) fn docx_with_body(body: &str) -> DocxPackage {
    DocxPackage::from_parts(vec![
        (
            "[Content_Types].xml",
            br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#
                .to_vec(),
        ),
        (DOCUMENT_PART, document_xml(body).into_bytes()),
    ])
    .unwrap()
}

/// Wrap `body` in a `w:document`.
pub(crate) fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// A single-run paragraph.
pub(crate) fn para(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_text(text)
    )
}

/// Concatenated text of every `w:t` in the main document, one line per
/// paragraph.
#[allow(clippy::unwrap_used)]
pub(crate) fn document_text(package: &DocxPackage) -> String {
    let xml = package.part(DOCUMENT_PART).unwrap();
    let chunks = crate::xml::split_paragraphs(xml).unwrap();
    let mut lines = Vec::new();
    for chunk in chunks {
        if let crate::xml::Chunk::Paragraph(range) = chunk {
            let nodes = crate::xml::text_nodes(xml, range).unwrap();
            lines.push(nodes.into_iter().map(|n| n.text).collect::<String>());
        }
    }
    lines.join("\n")
}
