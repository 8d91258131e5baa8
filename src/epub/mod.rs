//! Package I/O: extracting archives, reading the container and package
//! descriptor, and writing archives back.

mod parser;
mod reader;
mod writer;

use std::path::Path;

pub use parser::{locate_descriptor, parse_container_xml, parse_descriptor};
pub use reader::{extract, verify};
pub use writer::{copy_unchanged, repackage};

use crate::book::Book;
use crate::error::Result;

/// Build a [`Book`] from an extracted package rooted at `root`.
pub fn open_book(root: &Path) -> Result<Book> {
    let opf = locate_descriptor(root)?;
    let (spine, manifest) = parse_descriptor(&opf, root)?;
    Book::new(root, opf, spine, manifest)
}
