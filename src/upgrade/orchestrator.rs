//! In-place EPUB 2 to EPUB 3 upgrade of an extracted package.

use std::collections::HashSet;
use std::path::Path;

use super::nav::{self, MAX_NAV_DEPTH};
use super::version::{EpubVersion, detect};
use crate::book::{NCX_MEDIA_TYPE, XHTML_MEDIA_TYPE};
use crate::dom::{self, Attribute, Document, NodeId};
use crate::epub;
use crate::error::{Error, Result};
use crate::report::UpgradeReport;
use crate::util::{archive_path, decode_href};

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const NAV_FILE: &str = "nav.xhtml";
const DEFAULT_LANGUAGE: &str = "en";

/// Upgrade the package extracted at `root` to `target_version`.
///
/// Returns the version detected before the upgrade. A package that is
/// already version 3 is left untouched unless `force_rewrite` is set.
/// Missing metadata and navigation problems are recorded in `report`; only
/// structural errors in the package descriptor abort.
pub fn upgrade(
    root: &Path,
    target_version: &str,
    force_rewrite: bool,
    report: &mut UpgradeReport,
) -> Result<EpubVersion> {
    let opf_path = epub::locate_descriptor(root)?;
    let mut opf = dom::load_xml(&opf_path)?;
    let version = detect(&opf)?;

    if version.is_epub3() && !force_rewrite {
        report.note("Already EPUB 3, no upgrade needed");
        return Ok(version);
    }

    let (spine, manifest) = epub::parse_descriptor(&opf_path, root)?;
    let package = opf
        .document_element()
        .ok_or_else(|| Error::MissingElement("package".into()))?;

    opf.set_attr(package, "version", target_version);
    let lang = ensure_package_language(&mut opf, package, report);
    let metadata = ensure_metadata(&mut opf, package, report);
    ensure_required_metadata(&mut opf, package, metadata, &lang, report);

    let opf_dir = opf_path.parent().unwrap_or(root);
    convert_navigation(&mut opf, package, opf_dir, root, report)?;

    for item in &spine {
        let is_xhtml = manifest
            .get(&item.idref)
            .is_some_and(|m| m.is_content_document());
        if !is_xhtml {
            continue;
        }
        if let Err(e) = ensure_document_language(&item.resolved_href, &lang) {
            tracing::debug!("language not set on {}: {e}", item.resolved_href.display());
        }
    }

    dom::save_xml(&opf, &opf_path)?;
    tracing::info!("upgraded package from {version} to {target_version}");
    Ok(version)
}

/// Qualified name for a new child of `parent`, reusing the parent's prefix.
fn sibling_name(doc: &Document, parent: NodeId, local: &str) -> String {
    match doc.element_name(parent).and_then(|n| n.split_once(':')) {
        Some((prefix, _)) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn non_empty_text(doc: &Document, id: NodeId) -> Option<String> {
    let text = doc.text_content(id);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Make sure the package declares `xml:lang` and return the language in force.
fn ensure_package_language(opf: &mut Document, package: NodeId, report: &mut UpgradeReport) -> String {
    let existing = opf
        .get_attr(package, "xml:lang")
        .or_else(|| opf.get_attr(package, "lang"))
        .map(str::trim)
        .filter(|l| !l.is_empty());
    if let Some(lang) = existing {
        return lang.to_string();
    }

    let metadata = opf.child_by_local_name(package, "metadata");
    let declared = metadata
        .and_then(|m| opf.child_by_local_name(m, "language"))
        .and_then(|l| non_empty_text(opf, l));
    let lang = match declared {
        Some(lang) => lang,
        None => {
            if metadata.is_some() {
                report.warn("No language found, defaulting to 'en'");
            } else {
                report.warn("No metadata found, defaulting language to 'en'");
            }
            DEFAULT_LANGUAGE.to_string()
        }
    };
    opf.set_attr(package, "xml:lang", lang.as_str());
    lang
}

fn ensure_metadata(opf: &mut Document, package: NodeId, report: &mut UpgradeReport) -> NodeId {
    if let Some(metadata) = opf.child_by_local_name(package, "metadata") {
        return metadata;
    }
    let name = sibling_name(opf, package, "metadata");
    let metadata = opf.create_element(name, vec![Attribute::new("xmlns:dc", DC_NS)]);
    let first = opf.element_children(package).next();
    match first {
        Some(first) => opf.insert_before(first, metadata),
        None => opf.append(package, metadata),
    }
    report.warn("No metadata element found, created empty one");
    metadata
}

fn add_dc_element(opf: &mut Document, metadata: NodeId, local: &str, attrs: Vec<Attribute>, text: &str) {
    let element = opf.create_element(format!("dc:{local}"), attrs);
    opf.append(metadata, element);
    opf.append_text(element, text);
}

/// Insert placeholder `dc:title`, `dc:identifier` and `dc:language` entries
/// where the metadata lacks them.
fn ensure_required_metadata(
    opf: &mut Document,
    package: NodeId,
    metadata: NodeId,
    lang: &str,
    report: &mut UpgradeReport,
) {
    let missing = |opf: &Document, local: &str| opf.child_by_local_name(metadata, local).is_none();
    let needs_title = missing(opf, "title");
    let needs_identifier = missing(opf, "identifier");
    let needs_language = missing(opf, "language");

    if (needs_title || needs_identifier || needs_language)
        && !opf.has_attr(package, "xmlns:dc")
        && !opf.has_attr(metadata, "xmlns:dc")
    {
        opf.set_attr(metadata, "xmlns:dc", DC_NS);
    }

    if needs_title {
        add_dc_element(opf, metadata, "title", Vec::new(), "Unknown Title");
        report.warn("Missing dc:title, added placeholder");
    }
    if needs_identifier {
        add_dc_element(opf, metadata, "identifier", vec![Attribute::new("id", "bookid")], "unknown-id");
        if !opf.has_attr(package, "unique-identifier") {
            opf.set_attr(package, "unique-identifier", "bookid");
        }
        report.warn("Missing dc:identifier, added placeholder");
    }
    if needs_language {
        add_dc_element(opf, metadata, "language", Vec::new(), lang);
        report.warn(format!("Missing dc:language, added placeholder '{lang}'"));
    }
}

fn has_nav_property(opf: &Document, item: NodeId) -> bool {
    opf.get_attr(item, "properties")
        .is_some_and(|p| p.split_whitespace().any(|t| t == "nav"))
}

/// Convert the manifest's NCX, if any, into a registered navigation document.
fn convert_navigation(
    opf: &mut Document,
    package: NodeId,
    opf_dir: &Path,
    root: &Path,
    report: &mut UpgradeReport,
) -> Result<()> {
    let manifest = opf
        .child_by_local_name(package, "manifest")
        .ok_or_else(|| Error::MissingElement("manifest".into()))?;
    let items: Vec<NodeId> = opf
        .element_children(manifest)
        .filter(|&i| opf.local_name(i) == Some("item"))
        .collect();

    let ncx_item = items
        .iter()
        .copied()
        .find(|&i| opf.get_attr(i, "media-type") == Some(NCX_MEDIA_TYPE));
    let nav_item = items.iter().copied().find(|&i| has_nav_property(opf, i));
    let nav_href = nav_item
        .and_then(|i| opf.get_attr(i, "href"))
        .map(decode_href)
        .unwrap_or_else(|| NAV_FILE.to_string());

    let Some(ncx_item) = ncx_item else {
        if nav_item.is_some() || opf_dir.join(NAV_FILE).is_file() {
            report.note("nav.xhtml already exists, no conversion needed");
        } else {
            report.warn("No NCX found and no nav.xhtml exists - EPUB 3 requires navigation");
        }
        return Ok(());
    };

    let ncx_href = opf.get_attr(ncx_item, "href").map(decode_href).unwrap_or_default();
    let ncx_path = opf_dir.join(&ncx_href);
    match nav::convert_ncx(&ncx_path, &opf_dir.join(&nav_href), root) {
        Ok(conversion) => {
            register_nav(opf, manifest, &items, nav_item);
            let source = ncx_path
                .strip_prefix(root)
                .map(archive_path)
                .unwrap_or(ncx_href);
            report.mark_nav_converted(source);
            if conversion.truncated > 0 {
                report.note(format!(
                    "Navigation nested deeper than {MAX_NAV_DEPTH} levels was truncated ({} entries dropped)",
                    conversion.truncated
                ));
            }
        }
        Err(e) => report.warn(format!("Failed to convert NCX to nav.xhtml: {e}")),
    }
    Ok(())
}

/// Mark the navigation document in the manifest, adding an item if needed.
fn register_nav(opf: &mut Document, manifest: NodeId, items: &[NodeId], nav_item: Option<NodeId>) {
    let existing = nav_item.or_else(|| {
        items
            .iter()
            .copied()
            .find(|&i| opf.get_attr(i, "href").map(decode_href).as_deref() == Some(NAV_FILE))
    });

    if let Some(item) = existing {
        if !has_nav_property(opf, item) {
            let properties = match opf.get_attr(item, "properties") {
                Some(p) if !p.trim().is_empty() => format!("{} nav", p.trim()),
                _ => "nav".to_string(),
            };
            opf.set_attr(item, "properties", properties);
        }
        return;
    }

    let ids: HashSet<&str> = items.iter().filter_map(|&i| opf.get_attr(i, "id")).collect();
    let id = std::iter::once("nav".to_string())
        .chain((1..).map(|n| format!("nav-{n}")))
        .find(|candidate| !ids.contains(candidate.as_str()))
        .unwrap_or_default();

    let name = sibling_name(opf, manifest, "item");
    let item = opf.create_element(
        name,
        vec![
            Attribute::new("id", id),
            Attribute::new("href", NAV_FILE),
            Attribute::new("media-type", XHTML_MEDIA_TYPE),
            Attribute::new("properties", "nav"),
        ],
    );
    opf.append(manifest, item);
}

/// Give a content document's root element `lang` and `xml:lang` when it has
/// neither. Returns whether the file was rewritten.
fn ensure_document_language(path: &Path, lang: &str) -> Result<bool> {
    let mut doc = dom::load_xml(path)?;
    let html = doc
        .document_element()
        .ok_or_else(|| Error::MissingElement("html".into()))?;
    if doc.has_attr(html, "lang") || doc.has_attr(html, "xml:lang") {
        return Ok(false);
    }
    doc.set_attr(html, "lang", lang);
    doc.set_attr(html, "xml:lang", lang);
    dom::save_xhtml(&doc, path)?;
    Ok(true)
}
