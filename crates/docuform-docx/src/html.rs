//! Converting simple rich-text HTML into a DOCX template.
//!
//! Only the markup a basic rich-text editor produces is understood:
//! paragraphs, three heading levels, line breaks, bold, italic, underline,
//! and list items. Anything else contributes its text and nothing more.

use regex::Regex;

use crate::package::{DOCUMENT_PART, DocxPackage};
use crate::xml::{escape_text, unescape_text};
use crate::{Result, TemplateError};

const TOKEN_PATTERN: &str = r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*>|[^<]+|<";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="720"/></w:pPr></w:style></w:styles>"#;

const BULLET: &str = "\u{2022} ";

/// Build a DOCX package from simple HTML.
pub fn html_to_docx(html: &str) -> Result<DocxPackage> {
    let token = Regex::new(TOKEN_PATTERN).map_err(|e| TemplateError::Html(e.to_string()))?;
    let mut writer = BodyWriter::default();
    let mut skip_depth = 0usize;

    for caps in token.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let raw = whole.as_str();
        if raw.starts_with("<!--") {
            continue;
        }

        let Some(name) = caps.get(2) else {
            if skip_depth == 0 {
                writer.text(&unescape_text(raw));
            }
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if matches!(name.as_str(), "script" | "style" | "head" | "title") {
            if closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else if !raw.ends_with("/>") {
                skip_depth += 1;
            }
            continue;
        }
        if skip_depth > 0 {
            continue;
        }

        match (name.as_str(), closing) {
            ("p" | "div" | "blockquote" | "tr", false) => writer.start_paragraph(None),
            ("h1", false) => writer.start_paragraph(Some("Heading1")),
            ("h2", false) => writer.start_paragraph(Some("Heading2")),
            ("h3" | "h4" | "h5" | "h6", false) => writer.start_paragraph(Some("Heading3")),
            ("li", false) => {
                writer.start_paragraph(Some("ListParagraph"));
                writer.text(BULLET);
            }
            ("p" | "div" | "blockquote" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li", true) => {
                writer.end_paragraph();
            }
            ("br", _) => writer.line_break(),
            ("b" | "strong", _) => writer.bold = bump(writer.bold, closing),
            ("i" | "em", _) => writer.italic = bump(writer.italic, closing),
            ("u" | "ins", _) => writer.underline = bump(writer.underline, closing),
            ("td" | "th", true) => writer.text(" "),
            _ => {}
        }
    }

    let body = writer.finish();
    log::debug!("Converted {} bytes of HTML into a DOCX body of {} bytes", html.len(), body.len());

    DocxPackage::from_parts(vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec()),
        (DOCUMENT_PART, document(&body).into_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes().to_vec()),
        ("word/styles.xml", STYLES.as_bytes().to_vec()),
    ])
}

fn bump(depth: usize, closing: bool) -> usize {
    if closing {
        depth.saturating_sub(1)
    } else {
        depth + 1
    }
}

fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

#[derive(Default)]
struct BodyWriter {
    body: String,
    paragraph: Option<OpenParagraph>,
    bold: usize,
    italic: usize,
    underline: usize,
}

struct OpenParagraph {
    style: Option<&'static str>,
    runs: String,
    /// Whether the last character written was whitespace, for collapsing.
    trailing_space: bool,
}

impl BodyWriter {
    fn start_paragraph(&mut self, style: Option<&'static str>) {
        self.end_paragraph();
        self.paragraph = Some(OpenParagraph {
            style,
            runs: String::new(),
            trailing_space: true,
        });
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        self.body.push_str("<w:p>");
        if let Some(style) = paragraph.style {
            self.body
                .push_str(&format!(r#"<w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#));
        }
        self.body.push_str(&paragraph.runs);
        self.body.push_str("</w:p>");
    }

    fn open(&mut self) -> &mut OpenParagraph {
        self.paragraph.get_or_insert_with(|| OpenParagraph {
            style: None,
            runs: String::new(),
            trailing_space: true,
        })
    }

    fn run_properties(&self) -> String {
        let mut props = String::new();
        if self.bold > 0 {
            props.push_str("<w:b/>");
        }
        if self.italic > 0 {
            props.push_str("<w:i/>");
        }
        if self.underline > 0 {
            props.push_str(r#"<w:u w:val="single"/>"#);
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:rPr>{props}</w:rPr>")
        }
    }

    fn text(&mut self, text: &str) {
        let had_paragraph = self.paragraph.is_some();
        let trailing_space = self.paragraph.as_ref().is_none_or(|p| p.trailing_space);

        let mut collapsed = String::with_capacity(text.len());
        let mut last_space = trailing_space;
        for c in text.chars() {
            if c.is_whitespace() && c != '\u{a0}' {
                if !last_space {
                    collapsed.push(' ');
                }
                last_space = true;
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }
        if collapsed.is_empty() {
            return;
        }
        // Whitespace between blocks should not start a paragraph of its own.
        if !had_paragraph && collapsed.trim().is_empty() {
            return;
        }

        let props = self.run_properties();
        let paragraph = self.open();
        paragraph.runs.push_str(&format!(
            r#"<w:r>{props}<w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape_text(&collapsed)
        ));
        paragraph.trailing_space = last_space;
    }

    fn line_break(&mut self) {
        let paragraph = self.open();
        paragraph.runs.push_str("<w:r><w:br/></w:r>");
        paragraph.trailing_space = true;
    }

    fn finish(mut self) -> String {
        self.end_paragraph();
        if self.body.is_empty() {
            self.body.push_str("<w:p/>");
        }
        self.body
    }
}
