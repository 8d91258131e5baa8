//! Markup engine: arena tree, parsers and serializer for content documents,
//! package descriptors and NCX files.

mod arena;
mod serialize;
mod tree_sink;
mod xml;

use std::fs;
use std::path::Path;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{Attribute, ChildrenIter, Document, Namespace, Node, NodeData, NodeId};
pub use serialize::{to_xhtml, to_xml};
pub use tree_sink::DocumentSink;
pub use xml::parse_xml;

use crate::error::Result;
use crate::util::decode_markup;

/// Parse HTML with html5ever. Never fails; malformed input is recovered.
pub fn parse_html(html: &str) -> Document {
    let sink = DocumentSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_document()
}

/// Tolerant parse of a content document.
///
/// Well-formed XHTML is read as XML so the tree matches the file exactly;
/// anything else goes through the HTML5 parser.
pub fn parse_markup(bytes: &[u8]) -> Document {
    let text = decode_markup(bytes);
    match parse_xml(&text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("not well-formed XML ({e}), using HTML parser");
            parse_html(&text)
        }
    }
}

/// Read and tolerantly parse a content document from disk.
pub fn load_markup(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    Ok(parse_markup(&bytes))
}

/// Read and strictly parse an XML file from disk.
pub fn load_xml(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    parse_xml(&decode_markup(&bytes))
}

/// Write a content document back as pretty-printed XHTML.
pub fn save_xhtml(doc: &Document, path: &Path) -> Result<()> {
    fs::write(path, to_xhtml(doc))?;
    Ok(())
}

/// Write an XML document (package descriptor, NCX).
pub fn save_xml(doc: &Document, path: &Path) -> Result<()> {
    fs::write(path, to_xml(doc))?;
    Ok(())
}
