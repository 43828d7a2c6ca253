//! Parsed templates.
//!
//! Parsing turns each templatable part into a tree of [`Node`]s:
//!
//! - markup outside paragraphs is kept as a byte range,
//! - paragraphs carry their merged text and an inline tag tree,
//! - a section whose `{#name}` and `{/name}` tags each occupy a paragraph
//!   of their own becomes a block [`Node::Section`] over the paragraphs
//!   between them.

use std::ops::Range;

use crate::lexer::{Delimiters, Tag, TagKind, lex};
use crate::package::DocxPackage;
use crate::xml::{Chunk, TextNode, split_paragraphs, text_nodes, unbalanced_structure};
use crate::{Result, TemplateError};

/// A DOCX package whose template parts have been scanned for tags.
#[derive(Debug)]
pub struct Template {
    package: DocxPackage,
    delimiters: Delimiters,
    pub(crate) parts: Vec<ParsedPart>,
}

#[derive(Debug)]
pub(crate) struct ParsedPart {
    pub name: String,
    pub xml: String,
    pub nodes: Vec<Node>,
    pub paragraphs: Vec<Paragraph>,
    pub has_tags: bool,
}

#[derive(Debug)]
pub(crate) struct Paragraph {
    pub range: Range<usize>,
    pub text_nodes: Vec<TextNode>,
    /// Concatenated, entity-decoded text of all `w:t` nodes.
    pub text: String,
    /// Offset of each text node within `text`.
    pub starts: Vec<usize>,
    pub inline: Vec<Inline>,
}

#[derive(Debug)]
pub(crate) enum Node {
    Markup(Range<usize>),
    Paragraph(usize),
    Section(BlockSection),
}

#[derive(Debug)]
pub(crate) struct BlockSection {
    pub name: String,
    pub inverted: bool,
    pub body: Vec<Node>,
}

#[derive(Debug)]
pub(crate) enum Inline {
    Text(Tag),
    Section {
        open: Tag,
        close: Tag,
        body: Vec<Inline>,
    },
}

impl Inline {
    pub fn start(&self) -> usize {
        match self {
            Inline::Text(tag) => tag.start,
            Inline::Section { open, .. } => open.start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Inline::Text(tag) => tag.end,
            Inline::Section { close, .. } => close.end,
        }
    }
}

impl Template {
    /// Open and parse a template from DOCX bytes with default delimiters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(DocxPackage::from_bytes(bytes)?, &Delimiters::default())
    }

    /// Parse every templatable part of `package`.
    pub fn parse(package: DocxPackage, delimiters: &Delimiters) -> Result<Self> {
        delimiters.validate()?;

        let mut parts = Vec::new();
        for name in package.template_parts() {
            let xml = package.part(name)?.to_string();
            parts.push(parse_part(name, xml, delimiters)?);
        }

        let tagged = parts.iter().filter(|p| p.has_tags).count();
        log::debug!(
            "Parsed template: {} parts scanned, {tagged} contain tags",
            parts.len()
        );

        Ok(Self {
            package,
            delimiters: delimiters.clone(),
            parts,
        })
    }

    /// The underlying package.
    pub fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Delimiters the template was parsed with.
    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Whether any part contains at least one tag.
    pub fn has_tags(&self) -> bool {
        self.parts.iter().any(|p| p.has_tags)
    }
}

struct Frame {
    open: Tag,
    open_end: usize,
    parent: Vec<Node>,
}

enum Role {
    BlockOpen(Tag),
    BlockClose(Tag),
    Inline(Vec<Tag>),
}

fn parse_part(name: &str, xml: String, delimiters: &Delimiters) -> Result<ParsedPart> {
    let chunks = split_paragraphs(&xml).ok_or_else(|| TemplateError::Xml {
        part: name.to_string(),
        message: "unterminated paragraph".to_string(),
    })?;

    let mut paragraphs = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut has_tags = false;

    for chunk in chunks {
        let range = match chunk {
            Chunk::Markup(range) => {
                current.push(Node::Markup(range));
                continue;
            }
            Chunk::Paragraph(range) => range,
        };

        let nodes = text_nodes(&xml, range.clone()).ok_or_else(|| TemplateError::Xml {
            part: name.to_string(),
            message: "unterminated text node".to_string(),
        })?;
        let mut text = String::new();
        let mut starts = Vec::with_capacity(nodes.len());
        for node in &nodes {
            starts.push(text.len());
            text.push_str(&node.text);
        }

        let tags = lex(&text, delimiters, name)?;
        has_tags |= !tags.is_empty();

        match classify(&text, tags) {
            Role::BlockOpen(open) => {
                stack.push(Frame {
                    open,
                    open_end: range.end,
                    parent: std::mem::take(&mut current),
                });
            }
            Role::BlockClose(close) => {
                let frame = stack.pop().ok_or_else(|| TemplateError::UnopenedSection {
                    part: name.to_string(),
                    name: close.name.clone(),
                })?;
                if frame.open.name != close.name {
                    return Err(TemplateError::MismatchedSection {
                        part: name.to_string(),
                        open: frame.open.name,
                        close: close.name,
                    });
                }
                if let Some(element) = unbalanced_structure(&xml[frame.open_end..range.start]) {
                    return Err(TemplateError::SectionStructure {
                        part: name.to_string(),
                        name: close.name,
                        message: format!(
                            "opening and closing tags are in different {element} elements"
                        ),
                    });
                }
                let body = std::mem::replace(&mut current, frame.parent);
                current.push(Node::Section(BlockSection {
                    name: frame.open.name,
                    inverted: frame.open.kind == TagKind::InvertedOpen,
                    body,
                }));
            }
            Role::Inline(tags) => {
                let inline = inline_tree(tags, name)?;
                current.push(Node::Paragraph(paragraphs.len()));
                paragraphs.push(Paragraph {
                    range,
                    text_nodes: nodes,
                    text,
                    starts,
                    inline,
                });
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(TemplateError::UnclosedSection {
            part: name.to_string(),
            name: frame.open.name,
        });
    }

    Ok(ParsedPart {
        name: name.to_string(),
        xml,
        nodes: current,
        paragraphs,
        has_tags,
    })
}

/// A paragraph holding nothing but one section tag is a block boundary.
fn classify(text: &str, mut tags: Vec<Tag>) -> Role {
    if tags.len() == 1 {
        let tag = &tags[0];
        let standalone = text.trim() == &text[tag.start..tag.end];
        if standalone && tag.kind != TagKind::Text {
            let tag = tags.remove(0);
            return if tag.kind.is_open() {
                Role::BlockOpen(tag)
            } else {
                Role::BlockClose(tag)
            };
        }
    }
    Role::Inline(tags)
}

fn inline_tree(tags: Vec<Tag>, part: &str) -> Result<Vec<Inline>> {
    let mut stack: Vec<(Tag, Vec<Inline>)> = Vec::new();
    let mut current: Vec<Inline> = Vec::new();

    for tag in tags {
        match tag.kind {
            TagKind::Text => current.push(Inline::Text(tag)),
            TagKind::SectionOpen | TagKind::InvertedOpen => {
                stack.push((tag, std::mem::take(&mut current)));
            }
            TagKind::SectionClose => {
                let Some((open, parent)) = stack.pop() else {
                    return Err(TemplateError::UnopenedSection {
                        part: part.to_string(),
                        name: tag.name,
                    });
                };
                if open.name != tag.name {
                    return Err(TemplateError::MismatchedSection {
                        part: part.to_string(),
                        open: open.name,
                        close: tag.name,
                    });
                }
                let body = std::mem::replace(&mut current, parent);
                current.push(Inline::Section {
                    open,
                    close: tag,
                    body,
                });
            }
        }
    }

    match stack.pop() {
        Some((open, _)) => Err(TemplateError::UnclosedSection {
            part: part.to_string(),
            name: open.name,
        }),
        None => Ok(current),
    }
}
