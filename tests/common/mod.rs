//! Shared fixtures: small EPUB packages built on the fly.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Wrap `body` in a minimal XHTML document.
pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Test</title></head>
<body>
{body}
</body>
</html>"#
    )
}

/// Builder for an EPUB package rooted at `OEBPS/content.opf`.
#[derive(Debug, Clone)]
pub struct EpubFixture {
    version: String,
    language: Option<String>,
    documents: Vec<(String, String)>,
    stylesheets: Vec<(String, String)>,
    ncx: Option<String>,
}

impl Default for EpubFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubFixture {
    pub fn new() -> Self {
        Self {
            version: "2.0".to_string(),
            language: Some("en".to_string()),
            documents: Vec::new(),
            stylesheets: Vec::new(),
            ncx: None,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn without_language(mut self) -> Self {
        self.language = None;
        self
    }

    /// Add a spine document whose body is `body`.
    pub fn document(self, name: &str, body: &str) -> Self {
        let content = xhtml(body);
        self.raw_document(name, &content)
    }

    pub fn raw_document(mut self, name: &str, content: &str) -> Self {
        self.documents.push((name.to_string(), content.to_string()));
        self
    }

    pub fn stylesheet(mut self, name: &str, css: &str) -> Self {
        self.stylesheets.push((name.to_string(), css.to_string()));
        self
    }

    pub fn ncx(mut self, ncx: &str) -> Self {
        self.ncx = Some(ncx.to_string());
        self
    }

    pub fn opf(&self) -> String {
        let mut manifest = String::new();
        let mut spine = String::new();
        for (i, (name, _)) in self.documents.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"doc{i}\" href=\"{name}\" media-type=\"application/xhtml+xml\"/>\n"
            ));
            spine.push_str(&format!("    <itemref idref=\"doc{i}\"/>\n"));
        }
        for (i, (name, _)) in self.stylesheets.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"css{i}\" href=\"{name}\" media-type=\"text/css\"/>\n"
            ));
        }
        let toc = if self.ncx.is_some() {
            manifest.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            );
            " toc=\"ncx\""
        } else {
            ""
        };
        let language = self
            .language
            .as_ref()
            .map(|l| format!("\n    <dc:language>{l}</dc:language>"))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{version}" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture</dc:title>
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>{language}
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{toc}>
{spine}  </spine>
</package>"#,
            version = self.version
        )
    }

    /// Every file of the package, `mimetype` first.
    pub fn files(&self) -> Vec<(String, String)> {
        let mut files = vec![
            ("mimetype".to_string(), "application/epub+zip".to_string()),
            ("META-INF/container.xml".to_string(), CONTAINER.to_string()),
            ("OEBPS/content.opf".to_string(), self.opf()),
        ];
        for (name, content) in self.documents.iter().chain(&self.stylesheets) {
            files.push((format!("OEBPS/{name}"), content.clone()));
        }
        if let Some(ncx) = &self.ncx {
            files.push(("OEBPS/toc.ncx".to_string(), ncx.clone()));
        }
        files
    }

    /// Write the package as an extracted directory tree under `root`.
    pub fn write_dir(&self, root: &Path) {
        for (name, content) in self.files() {
            let path = root.join(&name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    /// Write the package as an EPUB archive at `path`.
    pub fn write(&self, path: &Path) -> PathBuf {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in self.files() {
            let method = if name == "mimetype" {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            zip.start_file(name.as_str(), SimpleFileOptions::default().compression_method(method))
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path.to_path_buf()
    }
}

fn open(epub: &Path) -> ZipArchive<File> {
    ZipArchive::new(File::open(epub).unwrap()).unwrap()
}

/// Entry names in archive order.
pub fn entry_names(epub: &Path) -> Vec<String> {
    let mut archive = open(epub);
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn read_entry(epub: &Path, name: &str) -> String {
    let mut archive = open(epub);
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

pub fn entry_compression(epub: &Path, name: &str) -> CompressionMethod {
    let mut archive = open(epub);
    let method = archive.by_name(name).unwrap().compression();
    method
}
