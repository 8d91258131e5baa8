//! Missing `alt` attributes on images.

use super::{Rule, RuleOutcome, for_each_document};
use crate::book::Book;
use crate::dom::{Document, NodeId};
use crate::report::Reporter;

const ADDED_ALT: &str = "images.added_alt";

/// Gives every `img` an `alt` attribute, empty when none was set.
pub struct ImageRule;

impl Rule for ImageRule {
    fn name(&self) -> &'static str {
        "images"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(ADDED_ALT, 0);
        for_each_document(book, reporter, |doc, reporter| {
            let added = add_missing_alt(doc);
            reporter.increment(ADDED_ALT, added as u64);
            (added > 0).then(|| format!("Added {added} alt attributes"))
        })
    }
}

pub fn add_missing_alt(doc: &mut Document) -> usize {
    let images: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("img") && !doc.has_attr(id, "alt"))
        .collect();
    for &img in &images {
        doc.set_attr(img, "alt", "");
    }
    images.len()
}
