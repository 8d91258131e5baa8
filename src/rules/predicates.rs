//! Shared predicates for repair rules.

use std::collections::HashSet;

use crate::dom::{Document, NodeId};

/// Phrasing elements that may appear inside a paragraph.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "br", "cite", "code", "del", "dfn", "em", "font", "i",
    "img", "ins", "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp", "small", "span", "strike",
    "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

const CHAPTER_KEYWORDS: &[&str] = &["chapter", "part", "book"];

pub fn is_inline(doc: &Document, id: NodeId) -> bool {
    doc.local_name(id).is_some_and(|n| INLINE_TAGS.contains(&n))
}

pub fn is_heading(doc: &Document, id: NodeId) -> bool {
    doc.local_name(id).is_some_and(|n| HEADING_TAGS.contains(&n))
}

/// `h1` or `h2`.
pub fn is_top_heading(doc: &Document, id: NodeId) -> bool {
    matches!(doc.local_name(id), Some("h1" | "h2"))
}

/// Only inline children, and something to show: non-whitespace text or at
/// least one inline element. Element children in `ignored` do not count.
pub fn is_block_text(doc: &Document, id: NodeId, ignored: &HashSet<NodeId>) -> bool {
    let mut has_inline = false;
    for child in doc.element_children(id).filter(|c| !ignored.contains(c)) {
        if !is_inline(doc, child) {
            return false;
        }
        has_inline = true;
    }
    has_inline || !doc.text_content(id).trim().is_empty()
}

/// `h1`/`h2` whose text names a chapter, part or book.
pub fn is_chapter_heading(doc: &Document, id: NodeId) -> bool {
    if !is_top_heading(doc, id) {
        return false;
    }
    let text = doc.text_content(id).to_lowercase();
    CHAPTER_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Whether the next element sibling is a chapter heading.
pub fn precedes_chapter_heading(doc: &Document, id: NodeId) -> bool {
    doc.next_element_sibling(id)
        .is_some_and(|next| is_chapter_heading(doc, next))
}

/// Empty `p`: no element children, whitespace-only text.
pub fn is_blank_paragraph(doc: &Document, id: NodeId) -> bool {
    doc.local_name(id) == Some("p") && doc.is_blank(id)
}
