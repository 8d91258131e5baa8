//! Opening and extracting EPUB archives.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Check that `path` exists and opens as a ZIP archive.
pub fn verify(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file))?;
    Ok(())
}

/// Extract every entry of the archive at `epub_path` into `dir`.
///
/// Entry names that would escape `dir` are rejected by the zip crate.
pub fn extract(epub_path: &Path, dir: &Path) -> Result<()> {
    if !epub_path.exists() {
        return Err(Error::InputNotFound(epub_path.to_path_buf()));
    }
    let file = File::open(epub_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    tracing::info!(
        entries = archive.len(),
        "extracting {}",
        epub_path.display()
    );
    archive.extract(dir)?;
    Ok(())
}
