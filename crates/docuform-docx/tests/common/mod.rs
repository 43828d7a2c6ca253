//! Common fixtures for docuform-docx integration tests.

use std::io::{Cursor, Write};

use docuform_docx::{DOCUMENT_PART, DocxPackage};
use regex::Regex;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A fake PNG payload stored under `word/media`.
pub const IMAGE_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

const EMPTY_RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="W_NS"><w:body><w:p w:rsidR="00A1" w:rsidRDefault="00A1"><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Progress Report</w:t></w:r></w:p><w:p w:rsidR="00B2"><w:r><w:t xml:space="preserve">Dear {</w:t></w:r><w:proofErr w:type="spellStart"/><w:r w:rsidR="00C3"><w:t>guardian</w:t></w:r><w:proofErr w:type="spellEnd"/><w:r><w:rPr><w:b/></w:rPr><w:t>_name},</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">This report covers </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>{student_name}</w:t></w:r><w:r><w:t xml:space="preserve"> (ID {student_id}).</w:t></w:r></w:p><w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tr><w:tc><w:tcPr><w:tcW w:w="9000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>{#courses}</w:t></w:r></w:p><w:p><w:r><w:t>{title}: {grade}</w:t></w:r></w:p><w:p><w:r><w:t>{/courses}</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>{^courses}No courses recorded.{/courses}</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Notes: {notes}</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

const HEADER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="W_NS"><w:p><w:r><w:t>{school} | {term}</w:t></w:r></w:p></w:hdr>"#;

const FOOTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="W_NS"><w:p><w:r><w:t>Page footer without tags</w:t></w:r></w:p></w:ftr>"#;

/// Zip `(name, contents)` pairs into DOCX bytes.
pub fn zip_parts(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A progress-report template as Word saves it: the greeting tag is split
/// over three runs by spell-check and formatting, the course loop is a
/// paragraph loop inside a table cell, and the header carries a tag too.
pub fn progress_report_docx() -> Vec<u8> {
    let document = DOCUMENT_XML.replace("W_NS", W_NS);
    let header = HEADER_XML.replace("W_NS", W_NS);
    let footer = FOOTER_XML.replace("W_NS", W_NS);

    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", EMPTY_RELS),
        (DOCUMENT_PART, document.as_bytes()),
        ("word/header1.xml", header.as_bytes()),
        ("word/footer1.xml", footer.as_bytes()),
        ("word/media/image1.png", IMAGE_BYTES),
        ("word/_rels/document.xml.rels", EMPTY_RELS),
    ])
}

/// The visible text of a part, one line per top-level paragraph.
pub fn part_text(package: &DocxPackage, part: &str) -> String {
    let xml = package.part(part).expect("part exists");
    let paragraph = Regex::new(r"(?s)<w:p[ >].*?</w:p>").unwrap();
    let text = Regex::new(r"<w:t(?: [^>]*)?>([^<]*)</w:t>").unwrap();
    paragraph
        .find_iter(xml)
        .map(|p| {
            text.captures_iter(p.as_str())
                .map(|c| docuform_docx::unescape_text(&c[1]))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
