//! Pretty-printing serializer for [`Document`].
//!
//! Output is always UTF-8 with an XML declaration. Indentation is only added
//! inside containers whose children are all block-level elements, so text
//! and inline runs are written back byte-for-byte and re-parsing the output
//! yields the same tree modulo that layout whitespace.

use super::arena::{Document, Namespace, NodeData, NodeId};
use crate::util::{escape_attr, escape_text};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

const INDENT: &str = "  ";

/// HTML void elements, written self-closed in XHTML output.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that may be laid out on their own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "base", "blockquote", "body", "caption", "col", "colgroup",
    "dd", "details", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "li", "link",
    "main", "meta", "nav", "noscript", "ol", "p", "pre", "script", "section", "style", "summary",
    "table", "tbody", "td", "template", "tfoot", "th", "thead", "title", "tr", "ul",
];

/// Elements whose content is never re-indented.
const PRESERVE_ELEMENTS: &[&str] = &["pre", "script", "style", "textarea"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Xhtml,
    Xml,
}

/// Serialize a content document as XHTML.
pub fn to_xhtml(doc: &Document) -> String {
    Serializer::new(doc, Flavor::Xhtml).run()
}

/// Serialize a generic XML document (package descriptor, NCX).
pub fn to_xml(doc: &Document) -> String {
    Serializer::new(doc, Flavor::Xml).run()
}

struct Serializer<'a> {
    doc: &'a Document,
    flavor: Flavor,
    out: String,
}

impl<'a> Serializer<'a> {
    fn new(doc: &'a Document, flavor: Flavor) -> Self {
        Self {
            doc,
            flavor,
            out: String::new(),
        }
    }

    fn run(mut self) -> String {
        self.out
            .push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");

        let doc = self.doc;
        for child in doc.children(doc.root()) {
            match doc.get(child).map(|n| &n.data) {
                Some(NodeData::Doctype(body)) => {
                    self.out.push_str("<!DOCTYPE ");
                    self.out.push_str(body);
                    self.out.push_str(">\n");
                }
                Some(NodeData::Comment(text)) if !is_pi_comment(text) => {
                    self.write_comment(text);
                    self.out.push('\n');
                }
                Some(NodeData::Element { .. }) => {
                    self.write_element(child, 0);
                    self.out.push('\n');
                }
                _ => {}
            }
        }
        self.out
    }

    fn write_node(&mut self, id: NodeId, depth: usize) {
        let doc = self.doc;
        match doc.get(id).map(|n| &n.data) {
            Some(NodeData::Element { .. }) => self.write_element(id, depth),
            Some(NodeData::Text(text)) => self.out.push_str(&escape_text(text)),
            Some(NodeData::Comment(text)) if !is_pi_comment(text) => self.write_comment(text),
            _ => {}
        }
    }

    /// Comment bodies may not contain `--` or end in `-`.
    fn write_comment(&mut self, text: &str) {
        let mut body = text.to_string();
        while body.contains("--") {
            body = body.replace("--", "- -");
        }
        if body.ends_with('-') {
            body.push(' ');
        }
        self.out.push_str("<!--");
        self.out.push_str(&body);
        self.out.push_str("-->");
    }

    fn write_element(&mut self, id: NodeId, depth: usize) {
        let doc = self.doc;
        let Some(name) = doc.element_name(id) else {
            return;
        };

        self.out.push('<');
        self.out.push_str(name);

        if let Some(ns) = self.missing_namespace(id) {
            self.out.push_str(" xmlns=\"");
            self.out.push_str(ns);
            self.out.push('"');
        }

        for attr in doc.attrs(id) {
            self.out.push(' ');
            self.out.push_str(&attr.name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(&attr.value));
            self.out.push('"');
        }

        if doc.first_child(id).is_none() {
            match self.flavor {
                Flavor::Xml => self.out.push_str("/>"),
                Flavor::Xhtml if VOID_ELEMENTS.contains(&name) => self.out.push_str("/>"),
                Flavor::Xhtml => {
                    self.out.push_str("></");
                    self.out.push_str(name);
                    self.out.push('>');
                }
            }
            return;
        }

        self.out.push('>');

        if self.is_block_layout(id) {
            let children: Vec<_> = doc
                .children(id)
                .filter(|&c| doc.text(c).is_none())
                .collect();
            for child in children {
                self.out.push('\n');
                self.push_indent(depth + 1);
                self.write_node(child, depth + 1);
            }
            self.out.push('\n');
            self.push_indent(depth);
        } else {
            for child in doc.children(id) {
                self.write_node(child, depth + 1);
            }
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn push_indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    /// Children are only elements (plus layout whitespace and comments), and
    /// for XHTML every element child is block-level.
    fn is_block_layout(&self, id: NodeId) -> bool {
        let doc = self.doc;
        if doc
            .element_name(id)
            .is_some_and(|n| PRESERVE_ELEMENTS.contains(&n))
        {
            return false;
        }

        let mut saw_element = false;
        for child in doc.children(id) {
            match doc.get(child).map(|n| &n.data) {
                Some(NodeData::Text(t)) if !t.trim().is_empty() => return false,
                Some(NodeData::Element { name, .. }) => {
                    if self.flavor == Flavor::Xhtml && !BLOCK_ELEMENTS.contains(&name.as_str()) {
                        return false;
                    }
                    saw_element = true;
                }
                _ => {}
            }
        }
        saw_element
    }

    /// Namespace declaration to add when the element needs one and has none.
    fn missing_namespace(&self, id: NodeId) -> Option<&'static str> {
        let doc = self.doc;
        if self.flavor != Flavor::Xhtml || doc.has_attr(id, "xmlns") {
            return None;
        }

        let is_document_element = doc.parent(id) == Some(doc.root());
        if is_document_element && doc.is_tag(id, "html") {
            return Some(XHTML_NS);
        }

        let ns = doc.namespace(id)?;
        let parent_ns = doc.parent(id).and_then(|p| doc.namespace(p));
        if parent_ns == Some(ns) {
            return None;
        }
        match ns {
            Namespace::Svg => Some(SVG_NS),
            Namespace::MathMl => Some(MATHML_NS),
            _ => None,
        }
    }
}

/// html5ever turns `<?xml ...?>` into a bogus comment starting with `?`.
fn is_pi_comment(text: &str) -> bool {
    text.starts_with('?')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, parse_markup, parse_xml};

    #[test]
    fn test_xhtml_declaration_and_namespace() {
        let doc = parse_html("<html><body><p>Hi</p></body></html>");
        let out = to_xhtml(&doc);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(out.contains("<html xmlns=\"http://www.w3.org/1999/xhtml\">"));
        assert!(!out.contains("<!--?xml"));
    }

    #[test]
    fn test_void_and_empty_elements() {
        let doc = parse_xml("<html><body><p></p><p>a<br/>b</p><img src=\"x.png\"/></body></html>")
            .unwrap();
        let out = to_xhtml(&doc);
        assert!(out.contains("<p></p>"));
        assert!(out.contains("<p>a<br/>b</p>"));
        assert!(out.contains("<img src=\"x.png\"/>"));
    }

    #[test]
    fn test_block_children_are_indented() {
        let doc = parse_xml("<html><body><p>One</p><p>Two</p></body></html>").unwrap();
        let out = to_xhtml(&doc);
        assert!(out.contains("<body>\n    <p>One</p>\n    <p>Two</p>\n  </body>"));
    }

    #[test]
    fn test_inline_content_untouched() {
        let doc = parse_xml("<div>Some <em>mixed</em> text</div>").unwrap();
        let out = to_xhtml(&doc);
        assert!(out.contains("<div>Some <em>mixed</em> text</div>"));
    }

    #[test]
    fn test_text_and_attributes_escaped() {
        let doc = parse_xml(r#"<p title="a &quot;b&quot;">x &lt; y &amp; z</p>"#).unwrap();
        let out = to_xhtml(&doc);
        assert!(out.contains(r#"<p title="a &quot;b&quot;">x &lt; y &amp; z</p>"#));
    }

    #[test]
    fn test_xml_self_closes_empty() {
        let doc = parse_xml(r#"<package><manifest><item id="a" href="a.xhtml"></item></manifest></package>"#)
            .unwrap();
        let out = to_xml(&doc);
        assert!(out.contains(r#"<item id="a" href="a.xhtml"/>"#));
    }

    #[test]
    fn test_round_trip_is_stable() {
        let src = "<html><head><title>T</title></head><body><div><p>a <b>b</b></p><hr/></div></body></html>";
        let first = to_xhtml(&parse_markup(src.as_bytes()));
        let second = to_xhtml(&parse_markup(first.as_bytes()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_svg_namespace_added() {
        let doc = parse_html("<html><body><svg><rect/></svg></body></html>");
        let out = to_xhtml(&doc);
        assert!(out.contains("<svg xmlns=\"http://www.w3.org/2000/svg\">"));
    }

    #[test]
    fn test_comments_stay_well_formed() {
        let doc = parse_markup(b"<html><body><!-- a---b --><p>x</p><!--trailing-dash---></body></html>");
        let out = to_xhtml(&doc);
        assert!(out.contains("<!-- a- - -b -->"), "{out}");
        let bodies: Vec<&str> = out
            .split("<!--")
            .skip(1)
            .filter_map(|rest| rest.split_once("-->").map(|(body, _)| body))
            .collect();
        assert_eq!(bodies.len(), 2);
        for body in bodies {
            assert!(!body.contains("--"), "{body:?}");
            assert!(!body.ends_with('-'), "{body:?}");
        }
    }

    #[test]
    fn test_doctype_preserved() {
        let doc = parse_xml(
            "<!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\"><ncx/>",
        )
        .unwrap();
        let out = to_xml(&doc);
        assert!(out.contains("<!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\""));
    }
}
