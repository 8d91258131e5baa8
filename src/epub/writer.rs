//! Repackaging an extracted directory tree into an EPUB archive.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;
use crate::util::archive_path;

const MIMETYPE: &[u8] = b"application/epub+zip";

/// Zip `root` into `output_path`.
///
/// `mimetype` is written first and stored uncompressed (synthesized when the
/// tree has none); every other file follows in sorted path order, deflated.
pub fn repackage(root: &Path, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mimetype_path = root.join("mimetype");
    zip.start_file("mimetype", options_stored)?;
    if mimetype_path.is_file() {
        zip.write_all(&fs::read(&mimetype_path)?)?;
    } else {
        tracing::warn!("package has no mimetype file, writing the standard one");
        zip.write_all(MIMETYPE)?;
    }

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut count = 0usize;
    for path in files {
        let name = entry_name(root, &path);
        if name == "mimetype" {
            continue;
        }
        zip.start_file(name.as_str(), options_deflate)?;
        zip.write_all(&fs::read(&path)?)?;
        count += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    tracing::info!(files = count + 1, "wrote {}", output_path.display());
    Ok(())
}

/// Copy an EPUB byte-for-byte.
pub fn copy_unchanged(input: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input, output)?;
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Archive entry name: root-relative with `/` separators.
fn entry_name(root: &Path, path: &Path) -> String {
    archive_path(path.strip_prefix(root).unwrap_or(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};
    use zip::ZipArchive;

    fn entry_names(path: &Path) -> Vec<(String, zip::CompressionMethod)> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(path).unwrap())).unwrap();
        (0..archive.len())
            .map(|i| {
                let entry = archive.by_index(i).unwrap();
                (entry.name().to_string(), entry.compression())
            })
            .collect()
    }

    #[test]
    fn test_mimetype_first_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("book");
        fs::create_dir_all(root.join("OEBPS")).unwrap();
        fs::create_dir_all(root.join("META-INF")).unwrap();
        fs::write(root.join("OEBPS/ch1.xhtml"), "<html/>").unwrap();
        fs::write(root.join("META-INF/container.xml"), "<container/>").unwrap();
        fs::write(root.join("mimetype"), "application/epub+zip").unwrap();

        let out = dir.path().join("out.epub");
        repackage(&root, &out).unwrap();

        let entries = entry_names(&out);
        assert_eq!(entries[0].0, "mimetype");
        assert_eq!(entries[0].1, zip::CompressionMethod::Stored);
        assert_eq!(entries.len(), 3);
        assert!(entries[1..]
            .iter()
            .all(|(_, m)| *m == zip::CompressionMethod::Deflated));
        assert!(entries.iter().any(|(n, _)| n == "OEBPS/ch1.xhtml"));
    }

    #[test]
    fn test_missing_mimetype_is_synthesized() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("book");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("content.opf"), "<package/>").unwrap();

        let out = dir.path().join("out.epub");
        repackage(&root, &out).unwrap();

        let mut archive = ZipArchive::new(BufReader::new(File::open(&out).unwrap())).unwrap();
        let mut mimetype = String::new();
        archive
            .by_name("mimetype")
            .unwrap()
            .read_to_string(&mut mimetype)
            .unwrap();
        assert_eq!(mimetype, "application/epub+zip");
    }

    #[test]
    fn test_copy_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.epub");
        fs::write(&input, b"bytes").unwrap();
        let output = dir.path().join("nested/out.epub");
        copy_unchanged(&input, &output).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"bytes");
    }
}
