//! Package version detection.

use std::fmt;
use std::path::Path;

use crate::dom::{self, Document};
use crate::error::{Error, Result};

/// Version declared on the `package` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubVersion {
    /// `"2"`, `"3"`, or the major component as written.
    pub normalized: String,
    /// The full attribute value, e.g. `2.0.1`.
    pub raw: String,
}

impl EpubVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let major = raw.split('.').next().unwrap_or(raw);
        let normalized = match major {
            "2" => "2",
            "3" => "3",
            other => other,
        };
        Self {
            normalized: normalized.to_string(),
            raw: raw.to_string(),
        }
    }

    pub fn is_epub3(&self) -> bool {
        self.normalized == "3"
    }
}

impl fmt::Display for EpubVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw, self.normalized)
    }
}

/// Read the version from a parsed package descriptor.
pub fn detect(opf: &Document) -> Result<EpubVersion> {
    let package = opf
        .document_element()
        .ok_or_else(|| Error::MissingElement("package".into()))?;
    let name = opf.local_name(package).unwrap_or_default();
    if name != "package" {
        return Err(Error::InvalidEpub(format!(
            "Expected <package> element, found <{name}>"
        )));
    }
    match opf.get_attr(package, "version").map(str::trim) {
        Some(version) if !version.is_empty() => Ok(EpubVersion::parse(version)),
        _ => Err(Error::MissingVersion),
    }
}

/// Load a package descriptor and read its version.
pub fn detect_file(opf_path: &Path) -> Result<EpubVersion> {
    detect(&dom::load_xml(opf_path)?)
}
