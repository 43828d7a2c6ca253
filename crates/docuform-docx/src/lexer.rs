//! Tag scanning over merged paragraph text.
//!
//! Word freely splits what the author typed as `{student_name}` across
//! several runs (spell-check marks, revision ids, formatting changes), so
//! tags are found in the concatenated text of a paragraph rather than in
//! individual `w:t` nodes.

use serde::{Deserialize, Serialize};

use crate::{Result, TemplateError};

/// Opening and closing tag delimiters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    /// Opening delimiter, `{` by default.
    pub open: String,
    /// Closing delimiter, `}` by default.
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{".to_string(),
            close: "}".to_string(),
        }
    }
}

impl Delimiters {
    /// Build a delimiter pair, e.g. `Delimiters::new("{{", "}}")`.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self> {
        let delimiters = Self {
            open: open.into(),
            close: close.into(),
        };
        delimiters.validate()?;
        Ok(delimiters)
    }

    /// Reject empty, identical, or whitespace-containing delimiters.
    pub fn validate(&self) -> Result<()> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(TemplateError::Delimiters("delimiters must not be empty".into()));
        }
        if self.open == self.close {
            return Err(TemplateError::Delimiters(
                "opening and closing delimiters must differ".into(),
            ));
        }
        if self.open.chars().chain(self.close.chars()).any(char::is_whitespace) {
            return Err(TemplateError::Delimiters(
                "delimiters must not contain whitespace".into(),
            ));
        }
        Ok(())
    }
}

/// What a tag does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    /// `{name}`: replaced by a value.
    Text,
    /// `{#name}`: starts a section.
    SectionOpen,
    /// `{^name}`: starts an inverted section.
    InvertedOpen,
    /// `{/name}`: ends a section.
    SectionClose,
}

impl TagKind {
    /// Whether this tag starts a section.
    pub fn is_open(self) -> bool {
        matches!(self, TagKind::SectionOpen | TagKind::InvertedOpen)
    }
}

/// A tag found in paragraph text; offsets are byte offsets into that text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Tag kind.
    pub kind: TagKind,
    /// Name with the kind prefix and surrounding whitespace removed.
    pub name: String,
    /// Offset of the opening delimiter.
    pub start: usize,
    /// Offset just past the closing delimiter.
    pub end: usize,
}

const CONTEXT_CHARS: usize = 24;

/// Scan `text` for tags.
///
/// `part` is only used for error messages.
pub fn lex(text: &str, delimiters: &Delimiters, part: &str) -> Result<Vec<Tag>> {
    let open = delimiters.open.as_str();
    let close = delimiters.close.as_str();
    let mut tags = Vec::new();
    let mut pos = 0;

    loop {
        let next_open = text[pos..].find(open).map(|i| pos + i);
        let next_close = text[pos..].find(close).map(|i| pos + i);

        let start = match (next_open, next_close) {
            (None, None) => break,
            (None, Some(c)) => return Err(unopened(text, pos, c, part)),
            (Some(o), Some(c)) if c < o => return Err(unopened(text, pos, c, part)),
            (Some(o), _) => o,
        };

        let inner_start = start + open.len();
        let Some(inner_end) = text[inner_start..].find(close).map(|i| inner_start + i) else {
            return Err(unclosed(text, inner_start, part));
        };
        if text[inner_start..inner_end].contains(open) {
            return Err(unclosed(text, inner_start, part));
        }

        let inner = text[inner_start..inner_end].trim();
        let (kind, name) = match inner.chars().next() {
            Some('#') => (TagKind::SectionOpen, inner[1..].trim()),
            Some('^') => (TagKind::InvertedOpen, inner[1..].trim()),
            Some('/') => (TagKind::SectionClose, inner[1..].trim()),
            _ => (TagKind::Text, inner),
        };
        if name.is_empty() {
            return Err(TemplateError::EmptyTag {
                part: part.to_string(),
            });
        }

        let end = inner_end + close.len();
        tags.push(Tag {
            kind,
            name: name.to_string(),
            start,
            end,
        });
        pos = end;
    }

    Ok(tags)
}

fn unclosed(text: &str, from: usize, part: &str) -> TemplateError {
    TemplateError::UnclosedTag {
        part: part.to_string(),
        context: text[from..].chars().take(CONTEXT_CHARS).collect(),
    }
}

fn unopened(text: &str, from: usize, close_at: usize, part: &str) -> TemplateError {
    let before: Vec<char> = text[from..close_at].chars().collect();
    let skip = before.len().saturating_sub(CONTEXT_CHARS);
    TemplateError::UnopenedTag {
        part: part.to_string(),
        context: before[skip..].iter().collect(),
    }
}
