//! Inline-only divs become paragraphs; stacked and trailing breaks go.

use std::collections::HashSet;

use super::breaks::page_breaks_to_remove;
use super::predicates::is_block_text;
use super::{Rule, RuleOutcome, for_each_document};
use crate::book::Book;
use crate::dom::{Document, NodeId};
use crate::report::Reporter;

const CONVERTED: &str = "paragraphs.converted_divs";
const REMOVED_BR: &str = "paragraphs.removed_br_breaks";

pub struct ParagraphRule;

impl Rule for ParagraphRule {
    fn name(&self) -> &'static str {
        "paragraphs"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(CONVERTED, 0);
        reporter.increment(REMOVED_BR, 0);
        for_each_document(book, reporter, |doc, reporter| {
            let divs = convert_divs(doc);
            let brs = collapse_breaks(doc) + remove_trailing_breaks(doc);
            reporter.increment(CONVERTED, divs as u64);
            reporter.increment(REMOVED_BR, brs as u64);
            (divs + brs > 0).then(|| format!("Converted {divs} divs, removed {brs} <br/> tags"))
        })
    }
}

/// Page breaks the break rule will drop later in the same run. Edits here
/// look through them so dropping them leaves nothing for a second run.
fn pending_page_breaks(doc: &Document) -> HashSet<NodeId> {
    page_breaks_to_remove(doc).into_iter().collect()
}

/// Next sibling that is not whitespace, a comment or in `ignored`.
fn next_significant(doc: &Document, id: NodeId, ignored: &HashSet<NodeId>) -> Option<NodeId> {
    std::iter::successors(doc.next_sibling(id), |&n| doc.next_sibling(n)).find(|&n| {
        !ignored.contains(&n)
            && (doc.is_element(n) || doc.text(n).is_some_and(|t| !t.trim().is_empty()))
    })
}

/// Rename `div`s holding only inline content to `p`.
pub fn convert_divs(doc: &mut Document) -> usize {
    let pending = pending_page_breaks(doc);
    let divs: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("div"))
        .collect();

    let mut converted = 0;
    for div in divs {
        if is_block_text(doc, div, &pending) {
            doc.rename(div, "p");
            converted += 1;
        }
    }
    converted
}

/// Remove every `br` directly followed by another `br`, leaving one per run.
pub fn collapse_breaks(doc: &mut Document) -> usize {
    let pending = pending_page_breaks(doc);
    let brs: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("br"))
        .collect();

    let mut removed = 0;
    for br in brs {
        let followed_by_br = next_significant(doc, br, &pending)
            .is_some_and(|next| doc.local_name(next) == Some("br"));
        if followed_by_br {
            doc.detach(br);
            removed += 1;
        }
    }
    removed
}

/// Remove a `br` that ends a paragraph.
pub fn remove_trailing_breaks(doc: &mut Document) -> usize {
    let pending = pending_page_breaks(doc);
    let paragraphs: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("p"))
        .collect();

    let mut removed = 0;
    for p in paragraphs {
        let Some(last) = doc
            .element_children(p)
            .filter(|c| !pending.contains(c))
            .last()
        else {
            continue;
        };
        if doc.local_name(last) != Some("br") {
            continue;
        }
        let only_space_after = std::iter::successors(doc.next_sibling(last), |&n| doc.next_sibling(n))
            .all(|n| pending.contains(&n) || doc.text(n).is_some_and(|t| t.trim().is_empty()));
        if only_space_after {
            doc.detach(last);
            removed += 1;
        }
    }
    removed
}
