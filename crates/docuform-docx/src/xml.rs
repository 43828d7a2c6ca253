//! Minimal WordprocessingML scanning.
//!
//! Rendering only needs to see paragraphs (`w:p`) and the text nodes
//! (`w:t`) inside them; everything else is copied through untouched. The
//! helpers here work on byte ranges into the original part so untouched
//! markup is never re-serialized.

use std::ops::Range;

/// A top-level slice of a part: either a paragraph or the markup between
/// paragraphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Chunk {
    /// Markup that is not inside any paragraph.
    Markup(Range<usize>),
    /// A complete `<w:p>…</w:p>` (or self-closing `<w:p/>`) element.
    Paragraph(Range<usize>),
}

/// A `<w:t>` element within a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TextNode {
    /// The opening tag, e.g. `<w:t xml:space="preserve">`.
    pub open_tag: Range<usize>,
    /// The escaped content between the opening and closing tags.
    pub content: Range<usize>,
    /// The content with entities decoded.
    pub text: String,
}

const PARAGRAPH_OPEN: &str = "<w:p";
const PARAGRAPH_CLOSE: &str = "</w:p>";
const TEXT_OPEN: &str = "<w:t";
const TEXT_CLOSE: &str = "</w:t>";

/// Opening tag written for every text node whose content changes.
pub(crate) const PRESERVE_TEXT_OPEN: &str = r#"<w:t xml:space="preserve">"#;

/// Escape text content for inclusion in XML.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the predefined XML entities and numeric character references.
///
/// Unknown or malformed references are kept verbatim.
pub fn unescape_text(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[..semi];
            decode_entity(entity).map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Whether `xml[at..]` starts an element named exactly `name` (so `<w:p`
/// matches `<w:p>` and `<w:p w:rsidR="…">` but not `<w:pPr>`).
fn starts_element(xml: &str, at: usize, name: &str) -> bool {
    if !xml[at..].starts_with(name) {
        return false;
    }
    matches!(
        xml.as_bytes().get(at + name.len()),
        Some(b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
    )
}

/// Find the next start of element `name` at or after `from`.
fn find_element(xml: &str, from: usize, name: &str) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = xml[search..].find(name) {
        let at = search + offset;
        if starts_element(xml, at, name) {
            return Some(at);
        }
        search = at + name.len();
    }
    None
}

/// End (exclusive) of the tag starting at `at`, and whether it self-closes.
fn tag_end(xml: &str, at: usize) -> Option<(usize, bool)> {
    let gt = at + xml[at..].find('>')?;
    let self_closing = gt > at && xml.as_bytes()[gt - 1] == b'/';
    Some((gt + 1, self_closing))
}

/// Split a part into paragraphs and the markup between them.
///
/// Nested paragraphs (text boxes) stay inside their outer paragraph.
/// Returns `None` if a paragraph is never closed.
pub(crate) fn split_paragraphs(xml: &str) -> Option<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_element(xml, pos, PARAGRAPH_OPEN) {
        if start > pos {
            chunks.push(Chunk::Markup(pos..start));
        }
        let end = paragraph_end(xml, start)?;
        chunks.push(Chunk::Paragraph(start..end));
        pos = end;
    }

    if pos < xml.len() {
        chunks.push(Chunk::Markup(pos..xml.len()));
    }
    Some(chunks)
}

fn paragraph_end(xml: &str, start: usize) -> Option<usize> {
    let (open_end, self_closing) = tag_end(xml, start)?;
    if self_closing {
        return Some(open_end);
    }

    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let next_open = find_element(xml, pos, PARAGRAPH_OPEN);
        let next_close = xml[pos..].find(PARAGRAPH_CLOSE).map(|i| pos + i)?;
        match next_open {
            Some(open) if open < next_close => {
                let (end, self_closing) = tag_end(xml, open)?;
                if !self_closing {
                    depth += 1;
                }
                pos = end;
            }
            _ => {
                depth -= 1;
                pos = next_close + PARAGRAPH_CLOSE.len();
                if depth == 0 {
                    return Some(pos);
                }
            }
        }
    }
}

/// Collect the text nodes of `xml[range]`, with ranges relative to `xml`.
pub(crate) fn text_nodes(xml: &str, range: Range<usize>) -> Option<Vec<TextNode>> {
    let mut nodes = Vec::new();
    let mut pos = range.start;

    while let Some(start) = find_element(&xml[..range.end], pos, TEXT_OPEN) {
        let (open_end, self_closing) = tag_end(xml, start)?;
        if self_closing {
            pos = open_end;
            continue;
        }
        let close = open_end + xml[open_end..range.end].find(TEXT_CLOSE)?;
        nodes.push(TextNode {
            open_tag: start..open_end,
            content: open_end..close,
            text: unescape_text(&xml[open_end..close]),
        });
        pos = close + TEXT_CLOSE.len();
    }
    Some(nodes)
}

/// Elements whose open/close counts must balance across a repeated block.
const STRUCTURAL_ELEMENTS: &[(&str, &str)] = &[
    ("<w:tbl", "</w:tbl>"),
    ("<w:tr", "</w:tr>"),
    ("<w:tc", "</w:tc>"),
    ("<w:sdt", "</w:sdt>"),
    ("<w:txbxContent", "</w:txbxContent>"),
];

/// Name of the first structural element left unbalanced in `xml`, if any.
///
/// An element is unbalanced when a close appears before its open or the
/// counts differ, e.g. `</w:tc><w:tc>` between two cells.
pub(crate) fn unbalanced_structure(xml: &str) -> Option<&'static str> {
    STRUCTURAL_ELEMENTS.iter().find_map(|(open, close)| {
        let mut events: Vec<(usize, i32)> = Vec::new();
        let mut pos = 0;
        while let Some(at) = find_element(xml, pos, open) {
            let Some((end, self_closing)) = tag_end(xml, at) else {
                break;
            };
            if !self_closing {
                events.push((at, 1));
            }
            pos = end;
        }
        events.extend(xml.match_indices(close).map(|(at, _)| (at, -1)));
        events.sort_unstable();

        let mut depth = 0i32;
        let never_negative = events.iter().all(|(_, delta)| {
            depth += delta;
            depth >= 0
        });
        (!never_negative || depth != 0).then_some(&open[1..])
    })
}

/// Insert an empty paragraph into table cells left without one.
///
/// Word refuses to open a document whose `w:tc` has no `w:p`, which
/// happens when a section inside a cell renders to nothing.
pub(crate) fn ensure_cells_have_paragraphs(xml: &str) -> String {
    const CELL_CLOSE: &str = "</w:tc>";
    if !xml.contains(CELL_CLOSE) {
        return xml.to_string();
    }

    let mut out = String::with_capacity(xml.len());
    let mut pos = 0;
    while let Some(offset) = xml[pos..].find(CELL_CLOSE) {
        let close = pos + offset;
        let cell_start = last_cell_start(xml, close).unwrap_or(pos);
        let body = &xml[cell_start..close];
        out.push_str(&xml[pos..close]);
        if find_element(body, 0, PARAGRAPH_OPEN).is_none() {
            out.push_str("<w:p/>");
        }
        out.push_str(CELL_CLOSE);
        pos = close + CELL_CLOSE.len();
    }
    out.push_str(&xml[pos..]);
    out
}

fn last_cell_start(xml: &str, before: usize) -> Option<usize> {
    let mut search_end = before;
    while let Some(at) = xml[..search_end].rfind("<w:tc") {
        if starts_element(xml, at, "<w:tc") {
            return Some(at);
        }
        search_end = at;
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("A & B <c> \"d\""), "A &amp; B &lt;c&gt; &quot;d&quot;");
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text("Tom &amp; Jerry &lt;3"), "Tom & Jerry <3");
        assert_eq!(unescape_text("&#65;&#x42;&apos;"), "AB'");
    }

    #[test]
    fn test_unescape_keeps_unknown_entities() {
        assert_eq!(unescape_text("a &bogus; b & c"), "a &bogus; b & c");
    }

    #[test]
    fn test_split_paragraphs() {
        let xml = "<w:body><w:p><w:r><w:t>A</w:t></w:r></w:p><w:p/><w:sectPr/></w:body>";
        let chunks = split_paragraphs(xml).unwrap();
        assert_eq!(chunks.len(), 4);
        let Chunk::Paragraph(first) = &chunks[1] else {
            unreachable!("expected paragraph");
        };
        assert_eq!(&xml[first.clone()], "<w:p><w:r><w:t>A</w:t></w:r></w:p>");
        assert_eq!(chunks[2], Chunk::Paragraph(42..48));
    }

    #[test]
    fn test_split_paragraphs_ignores_ppr() {
        let xml = r#"<w:p w:rsidR="1"><w:pPr><w:jc w:val="center"/></w:pPr></w:p>"#;
        let chunks = split_paragraphs(xml).unwrap();
        assert_eq!(chunks, vec![Chunk::Paragraph(0..xml.len())]);
    }

    #[test]
    fn test_split_paragraphs_nested_textbox() {
        let xml = "<w:p><w:r><w:txbxContent><w:p><w:r><w:t>in</w:t></w:r></w:p></w:txbxContent></w:r></w:p><w:p></w:p>";
        let chunks = split_paragraphs(xml).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], Chunk::Paragraph(0..xml.len() - 11));
    }

    #[test]
    fn test_split_paragraphs_unclosed() {
        assert!(split_paragraphs("<w:p><w:r>").is_none());
    }

    #[test]
    fn test_text_nodes() {
        let xml = r#"<w:p><w:r><w:t>{na</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve">me} &amp;</w:t></w:r><w:r><w:t/></w:r></w:p>"#;
        let nodes = text_nodes(xml, 0..xml.len()).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].text, "{na");
        assert_eq!(nodes[1].text, "me} &");
        assert_eq!(&xml[nodes[1].open_tag.clone()], PRESERVE_TEXT_OPEN);
    }

    #[test]
    fn test_unbalanced_structure() {
        assert_eq!(unbalanced_structure("<w:p/><w:p></w:p>"), None);
        assert_eq!(
            unbalanced_structure("<w:tc><w:tcPr/><w:p/></w:tc>"),
            None
        );
        assert_eq!(
            unbalanced_structure("</w:tc><w:tc><w:p/>"),
            Some("w:tc"),
            "close before open spans two cells"
        );
        assert_eq!(unbalanced_structure("<w:p/></w:tc>"), Some("w:tc"));
        assert_eq!(unbalanced_structure("<w:tbl><w:tr>"), Some("w:tbl"));
    }

    #[test]
    fn test_ensure_cells_have_paragraphs() {
        let xml = "<w:tc><w:tcPr/></w:tc><w:tc><w:p/></w:tc>";
        assert_eq!(
            ensure_cells_have_paragraphs(xml),
            "<w:tc><w:tcPr/><w:p/></w:tc><w:tc><w:p/></w:tc>"
        );
    }

    proptest! {
        #[test]
        fn test_escape_unescape_roundtrip(s in "\\PC*") {
            prop_assert_eq!(unescape_text(&escape_text(&s)), s);
        }
    }
}
