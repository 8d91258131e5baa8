//! Container and package descriptor parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::book::{ManifestItem, SpineItem};
use crate::dom;
use crate::error::{Error, Result};
use crate::util::{archive_path, decode_href, decode_markup, resolve_path};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const ROOTFILE_MEDIA_TYPES: [&str; 2] = ["application/oebps-package+xml", "application/epub+zip"];

/// Find the package descriptor declared by `META-INF/container.xml`.
pub fn locate_descriptor(root: &Path) -> Result<PathBuf> {
    let container = root.join(CONTAINER_PATH);
    if !container.is_file() {
        return Err(Error::InvalidEpub(format!(
            "{CONTAINER_PATH} not found in EPUB"
        )));
    }
    let bytes = fs::read(&container)?;
    let full_path = parse_container_xml(&decode_markup(&bytes))?;
    let opf = root.join(&full_path);
    if !opf.is_file() {
        return Err(Error::InvalidEpub(format!(
            "package descriptor {full_path} not found"
        )));
    }
    Ok(opf)
}

/// Return the `full-path` of the first package `rootfile`, percent-decoded.
pub fn parse_container_xml(content: &str) -> Result<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"rootfile" => {
                let mut full_path = None;
                let mut media_type = None;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"full-path" => full_path = Some(value),
                        b"media-type" => media_type = Some(value),
                        _ => {}
                    }
                }
                let accepted = media_type
                    .as_deref()
                    .is_some_and(|m| ROOTFILE_MEDIA_TYPES.contains(&m));
                if let Some(path) = full_path.filter(|p| !p.is_empty())
                    && accepted
                {
                    return Ok(decode_href(&path));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

/// Read manifest and spine from the descriptor at `opf_path`.
///
/// Manifest hrefs come back relative to `root`; spine entries carry absolute
/// paths. Itemrefs without a manifest entry are skipped.
pub fn parse_descriptor(
    opf_path: &Path,
    root: &Path,
) -> Result<(Vec<SpineItem>, BTreeMap<String, ManifestItem>)> {
    let doc = dom::load_xml(opf_path)?;
    let opf_dir = opf_path
        .parent()
        .and_then(|p| p.strip_prefix(root).ok())
        .map(archive_path)
        .unwrap_or_default();

    let package = doc
        .document_element()
        .ok_or_else(|| Error::MissingElement("package".into()))?;
    let manifest_el = doc
        .child_by_local_name(package, "manifest")
        .ok_or_else(|| Error::MissingElement("manifest".into()))?;
    let spine_el = doc
        .child_by_local_name(package, "spine")
        .ok_or_else(|| Error::MissingElement("spine".into()))?;

    let mut manifest = BTreeMap::new();
    for item in doc.element_children(manifest_el) {
        if doc.local_name(item) != Some("item") {
            continue;
        }
        let (Some(id), Some(href)) = (doc.get_attr(item, "id"), doc.get_attr(item, "href")) else {
            tracing::warn!("manifest item without id or href skipped");
            continue;
        };
        let media_type = doc.get_attr(item, "media-type").unwrap_or_default();
        let resolved = resolve_path(&opf_dir, &decode_href(href));
        match ManifestItem::new(id, resolved, media_type) {
            Ok(entry) => {
                let entry = entry.with_properties(doc.get_attr(item, "properties").map(String::from));
                manifest.insert(entry.id.clone(), entry);
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }

    let mut spine = Vec::new();
    for itemref in doc.element_children(spine_el) {
        if doc.local_name(itemref) != Some("itemref") {
            continue;
        }
        let Some(idref) = doc.get_attr(itemref, "idref") else {
            continue;
        };
        match manifest.get(idref) {
            Some(item) => spine.push(SpineItem::new(idref, root.join(&item.href))),
            None => tracing::warn!("spine itemref '{idref}' not in manifest, skipped"),
        }
    }

    tracing::debug!(
        manifest = manifest.len(),
        spine = spine.len(),
        "parsed {}",
        opf_path.display()
    );
    Ok((spine, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content%20file.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>T</dc:title></metadata>
  <manifest>
    <item id="ch1" href="Text/ch%201.xhtml" media-type="application/xhtml+xml"/>
    <item id="style" href="../Styles/main.css" media-type="text/css"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ghost"/>
  </spine>
</package>"#;

    #[test]
    fn test_container_full_path_decoded() {
        assert_eq!(
            parse_container_xml(CONTAINER).unwrap(),
            "OEBPS/content file.opf"
        );
    }

    #[test]
    fn test_container_wrong_media_type() {
        let xml = r#"<container><rootfiles><rootfile full-path="a.opf" media-type="text/plain"/></rootfiles></container>"#;
        assert!(matches!(
            parse_container_xml(xml).unwrap_err(),
            Error::InvalidEpub(_)
        ));
    }

    #[test]
    fn test_container_accepts_epub_zip_media_type() {
        let xml = r#"<container><rootfiles><rootfile full-path="content.opf" media-type="application/epub+zip"/></rootfiles></container>"#;
        assert_eq!(parse_container_xml(xml).unwrap(), "content.opf");
    }

    #[test]
    fn test_missing_container() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_descriptor(dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid EPUB: META-INF/container.xml not found in EPUB"
        );
    }

    #[test]
    fn test_parse_descriptor_resolves_hrefs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("OEBPS")).unwrap();
        let opf = root.join("OEBPS/content.opf");
        fs::write(&opf, OPF).unwrap();

        let (spine, manifest) = parse_descriptor(&opf, root).unwrap();
        assert_eq!(manifest["ch1"].href, "OEBPS/Text/ch 1.xhtml");
        assert_eq!(manifest["style"].href, "Styles/main.css");
        assert!(manifest["nav"].has_property("nav"));
        assert_eq!(spine.len(), 1);
        assert_eq!(spine[0].resolved_href, root.join("OEBPS/Text/ch 1.xhtml"));
    }

    #[test]
    fn test_parse_descriptor_missing_spine() {
        let dir = tempfile::tempdir().unwrap();
        let opf = dir.path().join("content.opf");
        fs::write(&opf, r#"<package version="2.0"><manifest/></package>"#).unwrap();
        assert!(matches!(
            parse_descriptor(&opf, dir.path()).unwrap_err(),
            Error::MissingElement(ref e) if e == "spine"
        ));
    }
}
