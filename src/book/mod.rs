//! In-memory view of an extracted EPUB package: manifest, spine and the
//! paths rules read and write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::util::archive_path;

pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub const CSS_MEDIA_TYPE: &str = "text/css";
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// A resource listed in the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Path relative to the package root, `/`-separated.
    pub href: String,
    pub media_type: String,
    /// Space-separated `properties` attribute (`nav`, `cover-image`, ...).
    pub properties: Option<String>,
}

impl ManifestItem {
    /// Build a manifest item; `id` and `media_type` must be non-empty.
    pub fn new(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let media_type = media_type.into();
        if id.is_empty() {
            return Err(Error::InvalidEpub("manifest item with empty id".into()));
        }
        if media_type.is_empty() {
            return Err(Error::InvalidEpub(format!(
                "manifest item '{id}' has no media type"
            )));
        }
        Ok(Self {
            id,
            href: href.into(),
            media_type,
            properties: None,
        })
    }

    pub fn with_properties(mut self, properties: Option<String>) -> Self {
        self.properties = properties.filter(|p| !p.trim().is_empty());
        self
    }

    /// Whether `properties` contains the given token.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_whitespace().any(|t| t == property))
    }

    pub fn is_content_document(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }

    pub fn is_stylesheet(&self) -> bool {
        self.media_type == CSS_MEDIA_TYPE
    }
}

/// An entry in the reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,
    /// Absolute path of the referenced file inside the extracted package.
    pub resolved_href: PathBuf,
}

impl SpineItem {
    pub fn new(idref: impl Into<String>, resolved_href: impl Into<PathBuf>) -> Self {
        Self {
            idref: idref.into(),
            resolved_href: resolved_href.into(),
        }
    }
}

/// An extracted EPUB package.
///
/// The structure is read-only once built; rules rewrite the files it points
/// at on disk.
#[derive(Debug, Clone)]
pub struct Book {
    root_path: PathBuf,
    opf_path: PathBuf,
    manifest: BTreeMap<String, ManifestItem>,
    spine: Vec<SpineItem>,
}

impl Book {
    /// Assemble a book. Every spine `idref` must resolve to a manifest item.
    pub fn new(
        root_path: impl Into<PathBuf>,
        opf_path: impl Into<PathBuf>,
        spine: Vec<SpineItem>,
        manifest: BTreeMap<String, ManifestItem>,
    ) -> Result<Self> {
        if let Some(orphan) = spine.iter().find(|s| !manifest.contains_key(&s.idref)) {
            return Err(Error::InvalidEpub(format!(
                "spine item '{}' has no manifest entry",
                orphan.idref
            )));
        }
        Ok(Self {
            root_path: root_path.into(),
            opf_path: opf_path.into(),
            manifest,
            spine,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn opf_path(&self) -> &Path {
        &self.opf_path
    }

    pub fn manifest(&self) -> &BTreeMap<String, ManifestItem> {
        &self.manifest
    }

    pub fn spine(&self) -> &[SpineItem] {
        &self.spine
    }

    /// Spine documents with media type `application/xhtml+xml`, in reading
    /// order.
    pub fn content_documents(&self) -> Vec<&Path> {
        self.spine
            .iter()
            .filter(|s| {
                self.manifest
                    .get(&s.idref)
                    .is_some_and(ManifestItem::is_content_document)
            })
            .map(|s| s.resolved_href.as_path())
            .collect()
    }

    /// Manifest stylesheets as absolute paths, ordered by href.
    pub fn stylesheets(&self) -> Vec<PathBuf> {
        let mut hrefs: Vec<&str> = self
            .manifest
            .values()
            .filter(|item| item.is_stylesheet())
            .map(|item| item.href.as_str())
            .collect();
        hrefs.sort_unstable();
        hrefs.into_iter().map(|h| self.root_path.join(h)).collect()
    }

    /// Path relative to the package root, for reports.
    pub fn display_path(&self, path: &Path) -> String {
        archive_path(path.strip_prefix(&self.root_path).unwrap_or(path))
    }
}
