//! Well-formed XML to [`Document`] via quick-xml.
//!
//! Used directly for package descriptors, NCX files and container.xml, and
//! as the first attempt for content documents. Unlike the HTML parser it
//! keeps the tree exactly as written, so block elements nested inside `p`
//! survive and can be repaired.

use quick_xml::Reader;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};

use super::arena::{Attribute, Document, NodeId};
use crate::error::{Error, Result};
use crate::util::resolve_entity;

/// Parse well-formed XML into a document.
///
/// Fails on mismatched or unclosed tags, unknown entities, and documents
/// without a root element.
pub fn parse_xml(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.root()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let el = create_element(&mut doc, &e)?;
                append_to_top(&mut doc, &stack, el);
                stack.push(el);
            }
            Event::Empty(e) => {
                let el = create_element(&mut doc, &e)?;
                append_to_top(&mut doc, &stack, el);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(e) => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_text(&mut doc, &stack, &text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_text(&mut doc, &stack, &text);
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(e.as_ref());
                let resolved = resolve_entity(&name).ok_or_else(|| {
                    quick_xml::escape::EscapeError::UnrecognizedEntity(0..name.len(), name.to_string())
                })?;
                push_text(&mut doc, &stack, &resolved);
            }
            Event::Comment(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                let comment = doc.create_comment(text);
                append_to_top(&mut doc, &stack, comment);
            }
            Event::DocType(e) => {
                let body = String::from_utf8_lossy(e.as_ref()).trim().to_string();
                let doctype = doc.create_doctype(body);
                append_to_top(&mut doc, &stack, doctype);
            }
            Event::Decl(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if stack.len() > 1 {
        let open = stack
            .last()
            .and_then(|&id| doc.element_name(id))
            .unwrap_or_default()
            .to_string();
        return Err(Error::Xml(IllFormedError::MissingEndTag(open).into()));
    }

    if doc.document_element().is_none() {
        return Err(Error::MissingElement("root element".into()));
    }

    Ok(doc)
}

fn create_element(doc: &mut Document, e: &BytesStart<'_>) -> Result<NodeId> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs: Vec<Attribute> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)?.into_owned();
        if !attrs.iter().any(|a| a.name == key) {
            attrs.push(Attribute::new(key, value));
        }
    }
    Ok(doc.create_element(name, attrs))
}

fn append_to_top(doc: &mut Document, stack: &[NodeId], child: NodeId) {
    if let Some(&parent) = stack.last() {
        doc.append(parent, child);
    }
}

/// Text outside the root element (whitespace between prolog items) is dropped.
fn push_text(doc: &mut Document, stack: &[NodeId], text: &str) {
    if stack.len() == 1 {
        return;
    }
    if let Some(&parent) = stack.last() {
        doc.append_text(parent, text);
    }
}
