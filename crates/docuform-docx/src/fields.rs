//! Field discovery: the set of values a template asks for.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::lexer::{Delimiters, TagKind};
use crate::package::DocxPackage;
use crate::template::{Inline, Node, ParsedPart, Template};

/// Whether a field takes a single value or drives a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A value substituted into text.
    Text,
    /// A list or flag controlling a repeated or conditional block.
    Section,
}

/// A field discovered in a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    /// Tag name as written in the template.
    pub name: String,
    /// Human-readable label derived from the name.
    pub label: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Fields used inside a section, in first-use order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TemplateField>,
}

impl TemplateField {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: humanize(name),
            kind,
            children: Vec::new(),
        }
    }
}

/// Discover the fields of `package`, in order of first appearance across
/// the document, headers, footers, and notes.
pub fn discover_fields(package: &DocxPackage, delimiters: &Delimiters) -> Result<Vec<TemplateField>> {
    Ok(Template::parse(package.clone(), delimiters)?.fields())
}

impl Template {
    /// Fields used by this template, de-duplicated by name.
    ///
    /// A name used both as a value and as a section is reported as a
    /// section. The body of an inverted section renders in the enclosing
    /// scope, so its fields are reported at the enclosing level.
    pub fn fields(&self) -> Vec<TemplateField> {
        let mut fields = Vec::new();
        for part in &self.parts {
            collect_nodes(part, &part.nodes, &mut fields);
        }
        fields
    }
}

fn collect_nodes(part: &ParsedPart, nodes: &[Node], into: &mut Vec<TemplateField>) {
    for node in nodes {
        match node {
            Node::Markup(_) => {}
            Node::Paragraph(index) => collect_inline(&part.paragraphs[*index].inline, into),
            Node::Section(section) if section.inverted => {
                section_entry(into, &section.name);
                collect_nodes(part, &section.body, into);
            }
            Node::Section(section) => {
                let entry = section_entry(into, &section.name);
                collect_nodes(part, &section.body, &mut entry.children);
            }
        }
    }
}

fn collect_inline(items: &[Inline], into: &mut Vec<TemplateField>) {
    for item in items {
        match item {
            Inline::Text(tag) => text_entry(into, &tag.name),
            Inline::Section { open, body, .. } if open.kind == TagKind::InvertedOpen => {
                section_entry(into, &open.name);
                collect_inline(body, into);
            }
            Inline::Section { open, body, .. } => {
                let entry = section_entry(into, &open.name);
                collect_inline(body, &mut entry.children);
            }
        }
    }
}

fn text_entry(into: &mut Vec<TemplateField>, name: &str) {
    if name == "." || into.iter().any(|f| f.name == name) {
        return;
    }
    into.push(TemplateField::new(name, FieldKind::Text));
}

fn section_entry<'a>(into: &'a mut Vec<TemplateField>, name: &str) -> &'a mut TemplateField {
    let index = match into.iter().position(|f| f.name == name) {
        Some(index) => index,
        None => {
            into.push(TemplateField::new(name, FieldKind::Section));
            into.len() - 1
        }
    };
    let entry = &mut into[index];
    entry.kind = FieldKind::Section;
    entry
}

/// `student_name` → `Student Name`, `guardian.phone` → `Guardian Phone`.
pub fn humanize(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
