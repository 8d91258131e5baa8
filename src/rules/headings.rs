//! Fake heading promotion and heading nesting repair.

use std::collections::HashSet;

use super::breaks::page_breaks_to_remove;
use super::predicates::{is_block_text, is_heading};
use super::{Rule, RuleOutcome, for_each_document};
use crate::book::Book;
use crate::dom::{Document, NodeId};
use crate::report::Reporter;

const CONVERTED: &str = "headings.converted_fake_headings";
const NESTING: &str = "headings.fixed_nesting";

/// Class substrings that mark a paragraph as a styled heading.
const HEADING_CLASS_KEYWORDS: &[&str] = &["heading", "chapter", "section", "title"];

/// Promotes `<p class="chapter">` style headings to real heading elements
/// and lifts headings out of paragraphs.
pub struct HeadingRule;

impl Rule for HeadingRule {
    fn name(&self) -> &'static str {
        "headings"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(CONVERTED, 0);
        reporter.increment(NESTING, 0);
        for_each_document(book, reporter, |doc, reporter| {
            let converted = convert_fake_headings(doc);
            let nested = fix_nesting(doc);
            reporter.increment(CONVERTED, converted as u64);
            reporter.increment(NESTING, nested as u64);
            (converted + nested > 0).then(|| {
                format!("Converted {converted} fake headings, fixed {nested} nesting issues")
            })
        })
    }
}

/// Heading level implied by a class attribute. Earlier levels win.
pub fn heading_level(class: &str) -> u8 {
    let class = class.to_lowercase();
    if ["heading1", "h1", "title"].iter().any(|k| class.contains(k)) {
        1
    } else if ["heading2", "h2", "chapter"].iter().any(|k| class.contains(k)) {
        2
    } else if ["heading3", "h3", "section"].iter().any(|k| class.contains(k)) {
        3
    } else {
        2
    }
}

fn is_heading_token(token: &str) -> bool {
    let token = token.to_lowercase();
    HEADING_CLASS_KEYWORDS.iter().any(|k| token.contains(k))
}

pub fn convert_fake_headings(doc: &mut Document) -> usize {
    let candidates: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| matches!(doc.local_name(id), Some("p" | "div")))
        .filter(|&id| doc.classes(id).iter().any(|t| is_heading_token(t)))
        .collect();

    let page_breaks: HashSet<NodeId> = page_breaks_to_remove(doc).into_iter().collect();
    let mut converted = 0;
    for id in candidates {
        if !is_block_text(doc, id, &page_breaks) || doc.text_content(id).trim().is_empty() {
            continue;
        }
        let class = doc.get_attr(id, "class").unwrap_or_default().to_string();
        let level = heading_level(&class);

        let remaining: Vec<&str> = class
            .split_whitespace()
            .filter(|t| !is_heading_token(t))
            .collect();
        if remaining.is_empty() {
            doc.remove_attr(id, "class");
        } else {
            doc.set_attr(id, "class", remaining.join(" "));
        }
        doc.rename(id, &format!("h{level}"));
        converted += 1;
    }
    converted
}

/// Move headings that sit directly inside a `p` in front of it. The `p` is
/// dropped when nothing but whitespace is left in it.
pub fn fix_nesting(doc: &mut Document) -> usize {
    let nested: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| is_heading(doc, id))
        .filter(|&id| doc.parent(id).is_some_and(|p| doc.local_name(p) == Some("p")))
        .collect();

    let page_breaks: HashSet<NodeId> = page_breaks_to_remove(doc).into_iter().collect();
    let mut fixed = 0;
    for heading in nested {
        let Some(container) = doc.parent(heading) else {
            continue;
        };
        if doc.local_name(container) != Some("p") {
            continue;
        }
        doc.insert_before(container, heading);
        let emptied = doc.text_content(container).trim().is_empty()
            && doc.element_children(container).all(|c| page_breaks.contains(&c));
        if emptied {
            doc.detach(container);
        }
        fixed += 1;
    }
    fixed
}
