//! Marker-prefixed paragraph runs become `ul`/`ol` lists.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::{Rule, RuleOutcome, for_each_document};
use crate::book::Book;
use crate::dom::{Document, NodeId};
use crate::report::Reporter;

const CONVERTED: &str = "lists.converted_paragraphs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// `-`, `•` or `*` followed by whitespace.
static UNORDERED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-•*]\s+").unwrap());

/// Digits and a dot followed by whitespace.
static ORDERED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+").unwrap());

/// Marker kind and the byte length of leading whitespace plus marker.
fn classify(leading: &str) -> Option<(ListKind, usize)> {
    let trimmed = leading.trim_start();
    let indent = leading.len() - trimmed.len();
    if let Some(m) = UNORDERED_MARKER_RE.find(trimmed) {
        return Some((ListKind::Unordered, indent + m.end()));
    }
    ORDERED_MARKER_RE
        .find(trimmed)
        .map(|m| (ListKind::Ordered, indent + m.end()))
}

pub struct ListRule;

impl Rule for ListRule {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(CONVERTED, 0);
        for_each_document(book, reporter, |doc, reporter| {
            let created = convert_lists(doc);
            reporter.increment(CONVERTED, created as u64);
            (created > 0).then(|| format!("Created {created} semantic lists"))
        })
    }
}

/// Group runs of adjacent marker paragraphs into lists. Returns the number
/// of lists created.
pub fn convert_lists(doc: &mut Document) -> usize {
    let paragraphs: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("p"))
        .collect();

    let mut created = 0;
    for p in paragraphs {
        if doc.local_name(p) != Some("p") || !doc.is_attached(p) {
            continue;
        }
        let Some((kind, marker_len)) = classify(&doc.leading_text(p)) else {
            continue;
        };

        let mut run = vec![(p, marker_len)];
        let mut current = p;
        while doc.next_element_is_adjacent(current) {
            let Some(next) = doc.next_element_sibling(current) else {
                break;
            };
            if doc.local_name(next) != Some("p") {
                break;
            }
            match classify(&doc.leading_text(next)) {
                Some((next_kind, len)) if next_kind == kind => run.push((next, len)),
                _ => break,
            }
            current = next;
        }

        let list = doc.create_element(kind.tag(), Vec::new());
        doc.insert_before(p, list);
        for (item, len) in run {
            strip_prefix(doc, item, len);
            doc.rename(item, "li");
            doc.append(list, item);
        }
        created += 1;
    }
    created
}

/// Drop the first `len` bytes of the element's leading text.
fn strip_prefix(doc: &mut Document, id: NodeId, mut len: usize) {
    for node in doc.leading_text_nodes(id) {
        if len == 0 {
            break;
        }
        let text = doc.text(node).unwrap_or_default().to_string();
        if text.len() <= len {
            len -= text.len();
            doc.detach(node);
        } else {
            doc.set_text(node, &text[len..]);
            len = 0;
        }
    }
}
