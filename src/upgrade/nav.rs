//! NCX to EPUB 3 navigation document conversion.

use std::path::Path;

use crate::dom::{self, Attribute, Document, NodeId};
use crate::error::{Error, Result};
use crate::util::{archive_path, resolve_path};

/// Deepest navPoint nesting that is converted. Anything below is dropped.
pub const MAX_NAV_DEPTH: usize = 64;

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const OPS_NS: &str = "http://www.idpf.org/2007/ops";
const TOC_TITLE: &str = "Table of Contents";

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub label: String,
    pub href: String,
    pub children: Vec<NavEntry>,
}

/// Entries read from an NCX `navMap`.
#[derive(Debug, Default)]
pub struct NavMap {
    pub entries: Vec<NavEntry>,
    /// navPoints dropped for exceeding [`MAX_NAV_DEPTH`].
    pub truncated: usize,
}

/// Result of [`convert_ncx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NcxConversion {
    /// Entries written, nested ones included.
    pub entries: usize,
    pub truncated: usize,
}

/// Read the `navMap` of a parsed NCX document.
///
/// Only direct navPoint children are entries of a level. A navPoint without a
/// label or a `content/@src` is skipped together with its subtree.
pub fn read_ncx(ncx: &Document) -> Result<NavMap> {
    let nav_map = ncx
        .document_element()
        .and_then(|root| ncx.child_by_local_name(root, "navMap"))
        .ok_or_else(|| Error::MissingElement("navMap".into()))?;

    let mut truncated = 0;
    let entries = collect_points(ncx, nav_map, 1, &mut truncated);
    Ok(NavMap { entries, truncated })
}

fn collect_points(ncx: &Document, parent: NodeId, depth: usize, truncated: &mut usize) -> Vec<NavEntry> {
    let mut entries = Vec::new();
    for point in ncx.element_children(parent) {
        if ncx.local_name(point) != Some("navPoint") {
            continue;
        }
        if depth > MAX_NAV_DEPTH {
            *truncated += 1 + ncx
                .descendants(point)
                .into_iter()
                .filter(|&d| ncx.local_name(d) == Some("navPoint"))
                .count();
            continue;
        }

        let label = ncx
            .child_by_local_name(point, "navLabel")
            .and_then(|l| ncx.child_by_local_name(l, "text"))
            .map(|t| ncx.text_content(t).trim().to_string())
            .filter(|l| !l.is_empty());
        let href = ncx
            .child_by_local_name(point, "content")
            .and_then(|c| ncx.get_attr(c, "src"))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (Some(label), Some(href)) = (label, href) else {
            continue;
        };
        entries.push(NavEntry {
            label,
            href: href.to_string(),
            children: collect_points(ncx, point, depth + 1, truncated),
        });
    }
    entries
}

fn count_entries(entries: &[NavEntry]) -> usize {
    entries.iter().map(|e| 1 + count_entries(&e.children)).sum()
}

/// Build an XHTML navigation document holding `entries` as nested `ol` lists.
pub fn build_nav_document(entries: &[NavEntry]) -> Document {
    let mut doc = Document::new();
    let root = doc.root();

    let doctype = doc.create_doctype("html");
    doc.append(root, doctype);

    let html = doc.create_element(
        "html",
        vec![
            Attribute::new("xmlns", XHTML_NS),
            Attribute::new("xmlns:epub", OPS_NS),
        ],
    );
    doc.append(root, html);

    let head = doc.create_element("head", Vec::new());
    doc.append(html, head);
    let title = doc.create_element("title", Vec::new());
    doc.append(head, title);
    doc.append_text(title, TOC_TITLE);

    let body = doc.create_element("body", Vec::new());
    doc.append(html, body);
    let nav = doc.create_element(
        "nav",
        vec![Attribute::new("epub:type", "toc"), Attribute::new("id", "toc")],
    );
    doc.append(body, nav);
    let heading = doc.create_element("h1", Vec::new());
    doc.append(nav, heading);
    doc.append_text(heading, TOC_TITLE);

    let list = doc.create_element("ol", Vec::new());
    doc.append(nav, list);
    append_entries(&mut doc, list, entries);
    doc
}

fn append_entries(doc: &mut Document, list: NodeId, entries: &[NavEntry]) {
    for entry in entries {
        let item = doc.create_element("li", Vec::new());
        doc.append(list, item);
        let link = doc.create_element("a", vec![Attribute::new("href", entry.href.as_str())]);
        doc.append(item, link);
        doc.append_text(link, &entry.label);

        if !entry.children.is_empty() {
            let nested = doc.create_element("ol", Vec::new());
            doc.append(item, nested);
            append_entries(doc, nested, &entry.children);
        }
    }
}

/// Path from directory `base_dir` to `target`, both root-relative.
fn relative_from(base_dir: &str, target: &str) -> String {
    let base: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; base.len() - common];
    parts.extend(&target[common..]);
    parts.join("/")
}

/// Re-express an NCX `src` relative to the navigation document's directory.
fn rebase_href(href: &str, ncx_dir: &str, nav_dir: &str) -> String {
    if ncx_dir == nav_dir || href.contains("://") {
        return href.to_string();
    }
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    if path.is_empty() {
        return href.to_string();
    }
    let mut rebased = relative_from(nav_dir, &resolve_path(ncx_dir, path));
    if let Some(fragment) = fragment {
        rebased.push('#');
        rebased.push_str(fragment);
    }
    rebased
}

fn rebase_all(entries: &mut [NavEntry], ncx_dir: &str, nav_dir: &str) {
    for entry in entries {
        entry.href = rebase_href(&entry.href, ncx_dir, nav_dir);
        rebase_all(&mut entry.children, ncx_dir, nav_dir);
    }
}

fn dir_in_root(path: &Path, root: &Path) -> String {
    path.parent()
        .and_then(|p| p.strip_prefix(root).ok())
        .map(archive_path)
        .unwrap_or_default()
}

/// Convert the NCX at `ncx_path` into a navigation document at `nav_path`.
///
/// Both paths lie inside the extracted package at `root`; link targets are
/// rewritten when the two files live in different directories.
pub fn convert_ncx(ncx_path: &Path, nav_path: &Path, root: &Path) -> Result<NcxConversion> {
    let ncx = dom::load_xml(ncx_path)?;
    let mut map = read_ncx(&ncx)?;

    rebase_all(
        &mut map.entries,
        &dir_in_root(ncx_path, root),
        &dir_in_root(nav_path, root),
    );

    let nav = build_nav_document(&map.entries);
    dom::save_xhtml(&nav, nav_path)?;

    let conversion = NcxConversion {
        entries: count_entries(&map.entries),
        truncated: map.truncated,
    };
    tracing::debug!(
        entries = conversion.entries,
        truncated = conversion.truncated,
        "wrote {}",
        nav_path.display()
    );
    Ok(conversion)
}
