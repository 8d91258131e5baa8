//! Arena-allocated markup tree.
//!
//! Every node lives in one vector and is addressed by [`NodeId`]. Parent and
//! sibling links are plain indices into that vector: a parent owns nothing,
//! and detaching a node is a constant number of link updates. Detached nodes
//! stay in the arena but are unreachable from the document node.

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn to_option(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

/// Namespace an element was parsed in.
///
/// Only the HTML parser assigns foreign namespaces; the serializer uses them
/// to declare `xmlns` on inline SVG and MathML roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
    Other,
}

/// Element attribute. Names keep their prefix (`xml:lang`, `epub:type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with qualified name and ordered, unique-key attributes.
    Element {
        name: String,
        ns: Namespace,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    /// Doctype body as written after `<!DOCTYPE `.
    Doctype(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-based document tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the document node.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        doc.document = doc.alloc(Node::new(NodeData::Document));
        doc
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Number of allocated nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, name: impl Into<String>, attrs: Vec<Attribute>) -> NodeId {
        self.create_element_ns(name, Namespace::Other, attrs)
    }

    pub fn create_element_ns(
        &mut self,
        name: impl Into<String>,
        ns: Namespace,
        attrs: Vec<Attribute>,
    ) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name: name.into(),
            ns,
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text.into())))
    }

    pub fn create_doctype(&mut self, body: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype(body.into())))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`, detaching it first.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        if sibling == new_node {
            return;
        }
        self.detach(new_node);

        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent)
            && p.first_child == id
        {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent)
            && p.last_child == id
        {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Put `new_node` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        self.insert_before(old, new_node);
        self.detach(old);
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children: Vec<_> = self.children(from).collect();
        for child in children {
            self.append(to, child);
        }
    }

    /// Append text to `parent`, merging into a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Change an element's tag name, keeping attributes and children.
    pub fn rename(&mut self, id: NodeId, new_name: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { name, .. } = &mut node.data
        {
            *name = new_name.to_string();
        }
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, .. } = &mut node.data
        {
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value,
                None => attrs.push(Attribute::new(name, value)),
            }
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let node = self.get_mut(id)?;
        let NodeData::Element { attrs, .. } = &mut node.data else {
            return None;
        };
        let pos = attrs.iter().position(|a| a.name == name)?;
        Some(attrs.remove(pos).value)
    }

    /// Replace the content of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Text(existing) = &mut node.data
        {
            *existing = text.into();
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.to_option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.to_option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.to_option())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.to_option())
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        ChildrenIter {
            doc: self,
            current: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Element children only; text and comments are skipped.
    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent).filter(|&c| self.is_element(c))
    }

    /// First element child whose local name is `name` (`dc:title` matches `title`).
    pub fn child_by_local_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(parent)
            .find(|&c| self.local_name(c) == Some(name))
    }

    /// Next sibling that is an element, skipping text and comments.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sib) = current {
            if self.is_element(sib) {
                return Some(sib);
            }
            current = self.next_sibling(sib);
        }
        None
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(sib) = current {
            if self.is_element(sib) {
                return Some(sib);
            }
            current = self.prev_sibling(sib);
        }
        None
    }

    /// Whether only whitespace text (or comments) separates `id` from its next
    /// element sibling.
    pub fn next_element_is_adjacent(&self, id: NodeId) -> bool {
        let mut current = self.next_sibling(id);
        while let Some(sib) = current {
            match self.get(sib).map(|n| &n.data) {
                Some(NodeData::Element { .. }) => return true,
                Some(NodeData::Text(t)) if !t.trim().is_empty() => return false,
                _ => {}
            }
            current = self.next_sibling(sib);
        }
        false
    }

    /// Position of an element among its parent's element children.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent).position(|c| c == id)
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let start = stack.len();
            stack.extend(self.children(node));
            stack[start..].reverse();
        }
        out
    }

    /// Attached elements with the given tag name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.document)
            .into_iter()
            .filter(|&id| self.is_tag(id, tag))
            .collect()
    }

    /// First attached element with the given tag name.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document)
            .into_iter()
            .find(|&id| self.is_tag(id, tag))
    }

    /// The root element (`html`, `package`, `ncx`, ...).
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.document).next()
    }

    /// Whether the node is still reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.document {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Element and text queries
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Qualified tag name (`p`, `dc:title`).
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn namespace(&self, id: NodeId) -> Option<Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { ns, .. } => Some(*ns),
            _ => None,
        })
    }

    /// Tag name without prefix (`dc:title` -> `title`).
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element_name(id).map(crate::util::local_name)
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element_name(id) == Some(tag)
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attrs(id).iter().any(|a| a.name == name)
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.get_attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Text nodes that come before the first element child.
    pub fn leading_text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .take_while(|&c| !self.is_element(c))
            .filter(|&c| self.text(c).is_some())
            .collect()
    }

    /// Text before the first element child, concatenated.
    pub fn leading_text(&self, id: NodeId) -> String {
        self.leading_text_nodes(id)
            .into_iter()
            .filter_map(|t| self.text(t))
            .collect()
    }

    pub fn has_element_children(&self, id: NodeId) -> bool {
        self.element_children(id).next().is_some()
    }

    /// No element children and no non-whitespace text.
    pub fn is_blank(&self, id: NodeId) -> bool {
        !self.has_element_children(id) && self.text_content(id).trim().is_empty()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.doc.get(id).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// body > [p("one"), p("two"), p("three")]
    fn three_paragraphs() -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.create_element("body", vec![]);
        doc.append(doc.root(), body);
        let mut ps = Vec::new();
        for text in ["one", "two", "three"] {
            let p = doc.create_element("p", vec![]);
            doc.append_text(p, text);
            doc.append(body, p);
            ps.push(p);
        }
        (doc, body, ps)
    }

    #[test]
    fn test_append_and_children() {
        let (doc, body, ps) = three_paragraphs();
        let children: Vec<_> = doc.children(body).collect();
        assert_eq!(children, ps);
        assert_eq!(doc.parent(ps[1]), Some(body));
        assert_eq!(doc.text_content(body), "onetwothree");
    }

    #[test]
    fn test_detach_middle() {
        let (mut doc, body, ps) = three_paragraphs();
        doc.detach(ps[1]);
        let children: Vec<_> = doc.children(body).collect();
        assert_eq!(children, vec![ps[0], ps[2]]);
        assert!(!doc.is_attached(ps[1]));
        assert_eq!(doc.next_sibling(ps[0]), Some(ps[2]));
        assert_eq!(doc.prev_sibling(ps[2]), Some(ps[0]));
    }

    #[test]
    fn test_detach_first_and_last() {
        let (mut doc, body, ps) = three_paragraphs();
        doc.detach(ps[0]);
        doc.detach(ps[2]);
        let children: Vec<_> = doc.children(body).collect();
        assert_eq!(children, vec![ps[1]]);
        assert_eq!(doc.get(body).unwrap().first_child, ps[1]);
        assert_eq!(doc.get(body).unwrap().last_child, ps[1]);
    }

    #[test]
    fn test_insert_before_moves_attached_node() {
        let (mut doc, body, ps) = three_paragraphs();
        doc.insert_before(ps[0], ps[2]);
        let children: Vec<_> = doc.children(body).collect();
        assert_eq!(children, vec![ps[2], ps[0], ps[1]]);
    }

    #[test]
    fn test_replace() {
        let (mut doc, body, ps) = three_paragraphs();
        let hr = doc.create_element("hr", vec![]);
        doc.replace(ps[1], hr);
        let names: Vec<_> = doc
            .children(body)
            .filter_map(|c| doc.element_name(c))
            .collect();
        assert_eq!(names, vec!["p", "hr", "p"]);
    }

    #[test]
    fn test_move_children() {
        let (mut doc, body, ps) = three_paragraphs();
        let div = doc.create_element("div", vec![]);
        doc.append(doc.root(), div);
        doc.move_children(body, div);
        assert_eq!(doc.children(body).count(), 0);
        assert_eq!(doc.children(div).collect::<Vec<_>>(), ps);
    }

    #[test]
    fn test_element_siblings_skip_whitespace() {
        let mut doc = Document::new();
        let body = doc.create_element("body", vec![]);
        doc.append(doc.root(), body);
        let a = doc.create_element("p", vec![]);
        doc.append(body, a);
        doc.append_text(body, "\n  ");
        let b = doc.create_element("h2", vec![]);
        doc.append(body, b);

        assert_eq!(doc.next_element_sibling(a), Some(b));
        assert_eq!(doc.prev_element_sibling(b), Some(a));
        assert!(doc.next_element_is_adjacent(a));
        assert_eq!(doc.element_index(b), Some(1));
    }

    #[test]
    fn test_text_breaks_adjacency() {
        let mut doc = Document::new();
        let p = doc.create_element("p", vec![]);
        doc.append(doc.root(), p);
        let br1 = doc.create_element("br", vec![]);
        doc.append(p, br1);
        doc.append_text(p, "words");
        let br2 = doc.create_element("br", vec![]);
        doc.append(p, br2);
        assert!(!doc.next_element_is_adjacent(br1));
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let p = doc.create_element("p", vec![Attribute::new("class", "a  b")]);
        assert_eq!(doc.classes(p), vec!["a", "b"]);
        doc.set_attr(p, "class", "c");
        doc.set_attr(p, "id", "x");
        assert_eq!(doc.get_attr(p, "class"), Some("c"));
        assert_eq!(doc.attrs(p).len(), 2);
        assert_eq!(doc.remove_attr(p, "class").as_deref(), Some("c"));
        assert!(!doc.has_attr(p, "class"));
    }

    #[test]
    fn test_leading_text_and_blank() {
        let mut doc = Document::new();
        let p = doc.create_element("p", vec![]);
        doc.append(doc.root(), p);
        doc.append_text(p, "- item ");
        let em = doc.create_element("em", vec![]);
        doc.append(p, em);
        doc.append_text(em, "bold");
        doc.append_text(p, " tail");

        assert_eq!(doc.leading_text(p), "- item ");
        assert_eq!(doc.text_content(p), "- item bold tail");
        assert!(!doc.is_blank(p));

        let empty = doc.create_element("p", vec![]);
        doc.append_text(empty, " \u{a0} ");
        assert!(doc.is_blank(empty));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = Document::new();
        let html = doc.create_element("html", vec![]);
        doc.append(doc.root(), html);
        let body = doc.create_element("body", vec![]);
        doc.append(html, body);
        let div = doc.create_element("div", vec![]);
        doc.append(body, div);
        let p1 = doc.create_element("p", vec![]);
        doc.append(div, p1);
        let p2 = doc.create_element("p", vec![]);
        doc.append(body, p2);

        assert_eq!(doc.elements_by_tag("p"), vec![p1, p2]);
        assert_eq!(doc.document_element(), Some(html));
        assert_eq!(doc.local_name(html), Some("html"));
    }
}
