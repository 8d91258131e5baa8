//! Page break and scene break classification.
//!
//! Blank paragraphs and break-styled paragraphs are page break candidates.
//! A candidate survives only in front of a chapter heading; everything else
//! is either a scene break (a run of blank paragraphs) or noise.
//!
//! ## Passes
//!
//! 1. **Page breaks** - Decide every candidate, then remove the unwanted ones
//! 2. **Blank runs** - Two or more blank paragraphs become one scene-break `hr`
//! 3. **Break runs** - Three or more `br` become a scene break, or a single
//!    `br` in front of a chapter heading
//! 4. **Inline styles** - Strip page-break declarations not leading into a
//!    chapter heading
//!
//! Every pass re-queries the tree, so nodes detached by an earlier pass are
//! never touched.

use std::collections::HashSet;

use super::predicates::{is_blank_paragraph, is_top_heading, precedes_chapter_heading};
use super::{Rule, RuleOutcome, for_each_document};
use crate::book::Book;
use crate::dom::{Attribute, Document, NodeId};
use crate::report::Reporter;

const SCENE_BREAKS: &str = "breaks.normalized_scene_breaks";
const PAGE_BREAKS: &str = "breaks.removed_page_breaks";

const SCENE_BREAK_CLASS: &str = "scene-break";
const PAGE_BREAK_CLASSES: &[&str] = &["page-break", "pagebreak", "break"];
const MEDIA_TAGS: &[&str] = &["img", "svg", "image"];

/// Candidates at an element index below this are kept in front of any
/// `h1`/`h2`, keyword or not.
const LEADING_POSITIONS: usize = 3;

/// Counts from one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BreakStats {
    pub scene_breaks: usize,
    pub page_breaks_removed: usize,
}

impl BreakStats {
    fn changed(&self) -> bool {
        self.scene_breaks + self.page_breaks_removed > 0
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if self.scene_breaks > 0 {
            parts.push(format!("Created {} scene breaks", self.scene_breaks));
        }
        if self.page_breaks_removed > 0 {
            parts.push(format!("Removed {} page breaks", self.page_breaks_removed));
        }
        parts.join("; ")
    }
}

pub struct BreakRule;

impl Rule for BreakRule {
    fn name(&self) -> &'static str {
        "breaks"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(SCENE_BREAKS, 0);
        reporter.increment(PAGE_BREAKS, 0);
        for_each_document(book, reporter, |doc, reporter| {
            let stats = normalize_breaks(doc);
            reporter.increment(SCENE_BREAKS, stats.scene_breaks as u64);
            reporter.increment(PAGE_BREAKS, stats.page_breaks_removed as u64);
            stats.changed().then(|| stats.description())
        })
    }
}

/// Run all four passes over a document.
pub fn normalize_breaks(doc: &mut Document) -> BreakStats {
    let mut stats = BreakStats {
        page_breaks_removed: remove_page_breaks(doc),
        ..BreakStats::default()
    };
    stats.scene_breaks += replace_blank_runs(doc);
    let (scenes, removed) = collapse_break_runs(doc);
    stats.scene_breaks += scenes;
    stats.page_breaks_removed += removed;
    stats.page_breaks_removed += strip_inline_page_breaks(doc);
    stats
}

/// A `p` marked as a page break by class or inline style.
fn is_marked_page_break(doc: &Document, id: NodeId) -> bool {
    let by_class = doc
        .classes(id)
        .iter()
        .any(|c| PAGE_BREAK_CLASSES.contains(&c.to_lowercase().as_str()));
    let by_style = doc.get_attr(id, "style").is_some_and(|s| {
        let s = s.to_lowercase();
        s.contains("page-break") || s.contains("pagebreak")
    });
    by_class || by_style
}

fn has_media(doc: &Document, id: NodeId) -> bool {
    doc.descendants(id)
        .into_iter()
        .any(|d| doc.local_name(d).is_some_and(|n| MEDIA_TAGS.contains(&n)))
}

/// Page break candidate: a blank `p`, or a marked `p` with nothing visible.
pub fn is_page_break_candidate(doc: &Document, id: NodeId) -> bool {
    if doc.local_name(id) != Some("p") {
        return false;
    }
    if doc.is_blank(id) {
        return true;
    }
    is_marked_page_break(doc, id)
        && doc.text_content(id).trim().is_empty()
        && !has_media(doc, id)
}

/// Whether a candidate stays: it leads into a chapter heading, or it sits
/// among the first siblings and leads into any `h1`/`h2`.
pub fn is_retained(doc: &Document, id: NodeId) -> bool {
    if precedes_chapter_heading(doc, id) {
        return true;
    }
    let leading = doc.element_index(id).is_some_and(|i| i < LEADING_POSITIONS);
    leading
        && doc
            .next_element_sibling(id)
            .is_some_and(|next| is_top_heading(doc, next))
}

/// Maximal runs of blank paragraphs separated only by whitespace.
fn blank_runs(doc: &Document) -> Vec<Vec<NodeId>> {
    let mut seen = HashSet::new();
    let mut runs = Vec::new();
    for id in doc.descendants(doc.root()) {
        if seen.contains(&id) || !is_blank_paragraph(doc, id) {
            continue;
        }
        let mut run = vec![id];
        let mut current = id;
        while doc.next_element_is_adjacent(current) {
            match doc.next_element_sibling(current) {
                Some(next) if is_blank_paragraph(doc, next) => {
                    run.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        seen.extend(run.iter().copied());
        runs.push(run);
    }
    runs
}

/// Candidates pass 1 will remove. Blank paragraphs in a run of two or more
/// that does not end in front of a chapter heading are left for the
/// scene-break pass.
///
/// Earlier rules skip these nodes, so removing them never leaves work that
/// only a second run would pick up.
pub(crate) fn page_breaks_to_remove(doc: &Document) -> Vec<NodeId> {
    let mut scene_members = HashSet::new();
    for run in blank_runs(doc) {
        if run.len() >= 2
            && let Some(&last) = run.last()
            && !is_retained(doc, last)
        {
            scene_members.extend(run);
        }
    }

    doc.descendants(doc.root())
        .into_iter()
        .filter(|&id| is_page_break_candidate(doc, id))
        .filter(|id| !scene_members.contains(id))
        .filter(|&id| !is_retained(doc, id))
        .collect()
}

/// Pass 1.
pub fn remove_page_breaks(doc: &mut Document) -> usize {
    let doomed = page_breaks_to_remove(doc);
    for &id in &doomed {
        doc.detach(id);
    }
    doomed.len()
}

fn scene_break(doc: &mut Document) -> NodeId {
    doc.create_element("hr", vec![Attribute::new("class", SCENE_BREAK_CLASS)])
}

/// Pass 2.
pub fn replace_blank_runs(doc: &mut Document) -> usize {
    let mut replaced = 0;
    for run in blank_runs(doc) {
        if run.len() < 2 {
            continue;
        }
        let hr = scene_break(doc);
        doc.insert_before(run[0], hr);
        for id in run {
            doc.detach(id);
        }
        replaced += 1;
    }
    replaced
}

/// Pass 3. Returns (scene breaks created, page breaks removed).
pub fn collapse_break_runs(doc: &mut Document) -> (usize, usize) {
    let brs: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.local_name(id) == Some("br"))
        .collect();

    let mut seen = HashSet::new();
    let mut scenes = 0;
    let mut removed = 0;
    for br in brs {
        if seen.contains(&br) {
            continue;
        }
        let mut run = vec![br];
        let mut current = br;
        while doc.next_element_is_adjacent(current) {
            match doc.next_element_sibling(current) {
                Some(next) if doc.local_name(next) == Some("br") => {
                    run.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        seen.extend(run.iter().copied());
        if run.len() < 3 {
            continue;
        }

        if precedes_chapter_heading(doc, current) {
            for &extra in &run[1..] {
                doc.detach(extra);
            }
            removed += run.len() - 1;
        } else {
            let hr = scene_break(doc);
            doc.insert_before(run[0], hr);
            for id in run {
                doc.detach(id);
            }
            scenes += 1;
        }
    }
    (scenes, removed)
}

fn is_page_break_property(property: &str) -> bool {
    let property = property.trim().to_lowercase();
    property == "page-break-before" || property == "page-break-after" || property.contains("pagebreak")
}

/// Remove page-break declarations from an inline style. `None` when there
/// was nothing to remove.
pub fn strip_page_break_declarations(style: &str) -> Option<String> {
    let mut removed = false;
    let kept: Vec<&str> = style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or_default();
            let strip = is_page_break_property(property);
            removed |= strip;
            !strip
        })
        .collect();
    removed.then(|| kept.join("; "))
}

/// Pass 4.
pub fn strip_inline_page_breaks(doc: &mut Document) -> usize {
    let styled: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.has_attr(id, "style"))
        .collect();

    let mut stripped = 0;
    for id in styled {
        if precedes_chapter_heading(doc, id) {
            continue;
        }
        let Some(style) = doc.get_attr(id, "style") else {
            continue;
        };
        let Some(new_style) = strip_page_break_declarations(style) else {
            continue;
        };
        if new_style.is_empty() {
            doc.remove_attr(id, "style");
        } else {
            doc.set_attr(id, "style", new_style);
        }
        stripped += 1;
    }
    stripped
}
