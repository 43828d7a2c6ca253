//! Rendering parsed templates with JSON values.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::lexer::Delimiters;
use crate::package::DocxPackage;
use crate::template::{Inline, Node, ParsedPart, Paragraph, Template};
use crate::xml::{PRESERVE_TEXT_OPEN, ensure_cells_have_paragraphs, escape_text};

/// Markup that ends the current text node, inserts a line break, and opens
/// a new text node in the same run.
const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// Options controlling how values are written into the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Tag delimiters.
    pub delimiters: Delimiters,
    /// Turn `\n` in values into Word line breaks.
    pub linebreaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            linebreaks: true,
        }
    }
}

/// Parse `package` and render it with `values`.
pub fn render(package: &DocxPackage, values: &Value, options: &RenderOptions) -> Result<DocxPackage> {
    Template::parse(package.clone(), &options.delimiters)?.render(values, options)
}

/// Render DOCX bytes to DOCX bytes.
pub fn render_bytes(bytes: &[u8], values: &Value, options: &RenderOptions) -> Result<Vec<u8>> {
    let package = DocxPackage::from_bytes(bytes)?;
    render(&package, values, options)?.to_bytes()
}

impl Template {
    /// Render every templatable part with `values`.
    ///
    /// Parts without tags are copied unchanged, as is every other entry of
    /// the package.
    pub fn render(&self, values: &Value, options: &RenderOptions) -> Result<DocxPackage> {
        let mut package = self.package().clone();
        let mut rendered = 0usize;

        for part in self.parts.iter().filter(|p| p.has_tags) {
            let mut scopes = vec![values];
            let mut out = String::with_capacity(part.xml.len());
            let renderer = PartRenderer {
                part,
                linebreaks: options.linebreaks,
            };
            renderer.nodes(&part.nodes, &mut scopes, &mut out);
            package.set_part(&part.name, ensure_cells_have_paragraphs(&out));
            rendered += 1;
        }

        log::debug!("Rendered {rendered} template parts");
        Ok(package)
    }
}

struct PartRenderer<'t> {
    part: &'t ParsedPart,
    linebreaks: bool,
}

impl<'t> PartRenderer<'t> {
    fn nodes<'v>(&self, nodes: &[Node], scopes: &mut Vec<&'v Value>, out: &mut String) {
        for node in nodes {
            match node {
                Node::Markup(range) => out.push_str(&self.part.xml[range.clone()]),
                Node::Paragraph(index) => {
                    self.paragraph(&self.part.paragraphs[*index], scopes, out);
                }
                Node::Section(section) => {
                    let value = lookup(scopes, &section.name);
                    for pass in passes(value, section.inverted) {
                        with_scope(scopes, pass, |scopes| self.nodes(&section.body, scopes, out));
                    }
                }
            }
        }
    }

    fn paragraph<'v>(&self, paragraph: &Paragraph, scopes: &mut Vec<&'v Value>, out: &mut String) {
        let xml = &self.part.xml;
        if paragraph.inline.is_empty() {
            out.push_str(&xml[paragraph.range.clone()]);
            return;
        }

        let mut texts = TextBuffers {
            paragraph,
            buffers: vec![String::new(); paragraph.text_nodes.len()],
            linebreaks: self.linebreaks,
            target: None,
        };
        texts.inline(&paragraph.inline, 0..paragraph.text.len(), scopes);

        let mut pos = paragraph.range.start;
        for (node, text) in paragraph.text_nodes.iter().zip(&texts.buffers) {
            out.push_str(&xml[pos..node.open_tag.start]);
            out.push_str(PRESERVE_TEXT_OPEN);
            out.push_str(text);
            pos = node.content.end;
        }
        out.push_str(&xml[pos..paragraph.range.end]);
    }
}

/// New content for each text node of one paragraph.
///
/// Literal text stays in the node it came from, so run formatting is kept;
/// a tag's replacement goes to the node holding the tag's first character.
/// While a section spanning several nodes repeats, everything it writes goes
/// to `target` so the passes stay in order.
struct TextBuffers<'p> {
    paragraph: &'p Paragraph,
    buffers: Vec<String>,
    linebreaks: bool,
    target: Option<usize>,
}

impl<'p> TextBuffers<'p> {
    fn owner(&self, offset: usize) -> usize {
        self.paragraph
            .starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    fn literal(&mut self, range: Range<usize>) {
        let text = &self.paragraph.text;
        if let Some(target) = self.target {
            self.buffers[target].push_str(&escape_text(&text[range]));
            return;
        }
        let mut pos = range.start;
        while pos < range.end {
            let node = self.owner(pos);
            let node_end = self
                .paragraph
                .starts
                .get(node + 1)
                .copied()
                .unwrap_or(text.len());
            let end = node_end.min(range.end);
            self.buffers[node].push_str(&escape_text(&text[pos..end]));
            pos = end;
        }
    }

    fn value(&mut self, at: usize, text: &str) {
        let node = self.target.unwrap_or_else(|| self.owner(at));
        let buffer = &mut self.buffers[node];
        if self.linebreaks {
            let mut lines = text.split('\n');
            if let Some(first) = lines.next() {
                buffer.push_str(&escape_text(first.strip_suffix('\r').unwrap_or(first)));
            }
            for line in lines {
                buffer.push_str(LINE_BREAK);
                buffer.push_str(&escape_text(line.strip_suffix('\r').unwrap_or(line)));
            }
        } else {
            buffer.push_str(&escape_text(text));
        }
    }

    fn inline<'v>(&mut self, items: &[Inline], span: Range<usize>, scopes: &mut Vec<&'v Value>) {
        let mut pos = span.start;
        for item in items {
            self.literal(pos..item.start());
            match item {
                Inline::Text(tag) => {
                    let text = value_text(lookup(scopes, &tag.name));
                    self.value(tag.start, &text);
                }
                Inline::Section { open, close, body } => {
                    let value = lookup(scopes, &open.name);
                    let inverted = open.kind == crate::lexer::TagKind::InvertedOpen;
                    let runs = passes(value, inverted);
                    let outer = self.target;
                    if outer.is_none()
                        && runs.len() > 1
                        && self.owner(open.start) != self.owner(close.end - 1)
                    {
                        self.target = Some(self.owner(open.start));
                    }
                    for pass in runs {
                        with_scope(scopes, pass, |scopes| {
                            self.inline(body, open.end..close.start, scopes);
                        });
                    }
                    self.target = outer;
                }
            }
            pos = item.end();
        }
        self.literal(pos..span.end);
    }
}

fn with_scope<'v>(
    scopes: &mut Vec<&'v Value>,
    scope: Option<&'v Value>,
    f: impl FnOnce(&mut Vec<&'v Value>),
) {
    match scope {
        Some(value) => {
            scopes.push(value);
            f(scopes);
            scopes.pop();
        }
        None => f(scopes),
    }
}

/// How many times a section body renders, and with which scope.
///
/// `None` renders the body in the enclosing scope.
fn passes(value: Option<&Value>, inverted: bool) -> Vec<Option<&Value>> {
    if inverted {
        return if is_truthy(value) { Vec::new() } else { vec![None] };
    }
    match value {
        Some(Value::Array(items)) => items.iter().map(Some).collect(),
        Some(v) if is_truthy(Some(v)) => vec![Some(v)],
        _ => Vec::new(),
    }
}

/// Resolve `name` against the scope stack, innermost first.
///
/// `.` is the innermost scope. A key containing dots is first tried as-is,
/// then as a path whose first segment decides the scope.
pub(crate) fn lookup<'v>(scopes: &[&'v Value], name: &str) -> Option<&'v Value> {
    if name == "." {
        return scopes.last().copied();
    }

    for scope in scopes.iter().rev() {
        let Value::Object(map) = scope else {
            continue;
        };
        if let Some(value) = map.get(name) {
            return Some(value);
        }
        if let Some((head, rest)) = name.split_once('.') {
            if let Some(value) = map.get(head) {
                return rest.split('.').try_fold(value, |current, key| match current {
                    Value::Object(map) => map.get(key),
                    Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                    _ => None,
                });
            }
        }
    }
    None
}

/// Section truthiness: null, false, 0, "", an empty array and a missing
/// value are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// Text written for a value tag.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| value_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}
