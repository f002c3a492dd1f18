//! A minimal in-memory XML DOM.
//!
//! Per §9's design note — "model the tree as an arena of nodes with
//! parent/child indices... do not build parent pointers by hand" — every
//! node is stored in a flat `Vec` and referenced by index ([`NodeRef`]).
//! Detaching, reparenting, and cross-arena cloning (needed to move runs
//! between the original and modified packages during rewriting) are all
//! index operations; nothing here is a real pointer, so there is nothing to
//! dangle and nothing to drop in the wrong order.

use docx_core::NodeRef;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::error::{OoxmlError, Result};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeRef>,
    pub children: Vec<NodeRef>,
}

/// Strip an XML namespace prefix (`"w:p"` → `"p"`). OOXML parts consistently
/// bind the main namespace to the `w` prefix, so local-name matching this
/// way is enough to walk the schema without resolving namespace URIs.
pub fn local_name(tag: &str) -> &str {
    match tag.rfind(':') {
        Some(idx) => &tag[idx + 1..],
        None => tag,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    pub root: Option<NodeRef>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, r: NodeRef) -> &Node {
        &self.nodes[r]
    }

    pub fn node_mut(&mut self, r: NodeRef) -> &mut Node {
        &mut self.nodes[r]
    }

    pub fn alloc_element(&mut self, name: impl Into<String>, attrs: Vec<(String, String)>) -> NodeRef {
        self.nodes.push(Node {
            kind: NodeKind::Element { name: name.into(), attrs },
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn alloc_text(&mut self, text: impl Into<String>) -> NodeRef {
        self.nodes.push(Node {
            kind: NodeKind::Text(text.into()),
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn local_name_of(&self, r: NodeRef) -> Option<&str> {
        match &self.nodes[r].kind {
            NodeKind::Element { name, .. } => Some(local_name(name)),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, r: NodeRef, local: &str) -> bool {
        self.local_name_of(r) == Some(local)
    }

    pub fn attr(&self, r: NodeRef, local_attr: &str) -> Option<&str> {
        match &self.nodes[r].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| local_name(k) == local_attr)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, r: NodeRef, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[r].kind {
            let value = value.into();
            if let Some(existing) = attrs.iter_mut().find(|(k, _)| k == name) {
                existing.1 = value;
            } else {
                attrs.push((name.to_string(), value));
            }
        }
    }

    pub fn children(&self, r: NodeRef) -> &[NodeRef] {
        &self.nodes[r].children
    }

    pub fn parent(&self, r: NodeRef) -> Option<NodeRef> {
        self.nodes[r].parent
    }

    pub fn find_child(&self, parent: NodeRef, local: &str) -> Option<NodeRef> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.is_element(c, local))
    }

    pub fn find_children<'a>(&'a self, parent: NodeRef, local: &'a str) -> impl Iterator<Item = NodeRef> + 'a {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c, local))
    }

    /// Recursively find every descendant (not just direct children) with the
    /// given local name, document order.
    pub fn find_descendants(&self, root: NodeRef, local: &str, out: &mut Vec<NodeRef>) {
        for &child in &self.nodes[root].children {
            if self.is_element(child, local) {
                out.push(child);
            }
            self.find_descendants(child, local, out);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Insert `child` at `index` among `parent`'s children.
    pub fn insert_child_at(&mut self, parent: NodeRef, index: usize, child: NodeRef) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        let idx = index.min(self.nodes[parent].children.len());
        self.nodes[parent].children.insert(idx, child);
    }

    /// Remove `node` from its parent's child list. The node itself remains
    /// allocated (orphaned) so it can be re-attached elsewhere — this is how
    /// `wrap_with_ins`/`wrap_with_del` move an existing run under a new
    /// wrapper without losing it.
    pub fn detach(&mut self, node: NodeRef) {
        if let Some(parent) = self.nodes[node].parent {
            self.nodes[parent].children.retain(|&c| c != node);
        }
        self.nodes[node].parent = None;
    }

    /// Position of `child` within its parent's children, if attached.
    pub fn child_index(&self, child: NodeRef) -> Option<usize> {
        let parent = self.nodes[child].parent?;
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    /// Deep-clone a subtree (from this arena or another) into `self`,
    /// returning the new, unattached root. Used to clone `rPr` into a split
    /// run's right half and to clone modified-document runs into the
    /// original tree during insertion/move-to materialization.
    pub fn clone_subtree_from(&mut self, src: &Arena, src_root: NodeRef) -> NodeRef {
        let new_ref = match &src.nodes[src_root].kind {
            NodeKind::Element { name, attrs } => self.alloc_element(name.clone(), attrs.clone()),
            NodeKind::Text(t) => self.alloc_text(t.clone()),
        };
        for &child in &src.nodes[src_root].children {
            let new_child = self.clone_subtree_from(src, child);
            self.append_child(new_ref, new_child);
        }
        new_ref
    }

    /// Deep-clone a subtree within this same arena.
    pub fn clone_subtree(&mut self, root: NodeRef) -> NodeRef {
        let kind = self.nodes[root].kind.clone();
        let children = self.nodes[root].children.clone();
        let new_ref = match kind {
            NodeKind::Element { name, attrs } => self.alloc_element(name, attrs),
            NodeKind::Text(t) => self.alloc_text(t),
        };
        for child in children {
            let new_child = self.clone_subtree(child);
            self.append_child(new_ref, new_child);
        }
        new_ref
    }

    /// Concatenate the text of every `Text` descendant, document order.
    pub fn text_content(&self, root: NodeRef) -> String {
        let mut out = String::new();
        self.collect_text(root, &mut out);
        out
    }

    fn collect_text(&self, root: NodeRef, out: &mut String) {
        match &self.nodes[root].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for &child in &self.nodes[root].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialize a subtree (e.g. an `rPr` element) back to an XML string,
    /// verbatim (no reformatting), for storage in `RunInfo::rpr`.
    pub fn serialize_subtree(&self, root: NodeRef) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_node(&mut writer, root)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| OoxmlError::SerializationError(e.to_string()))
    }

    fn write_node(&self, writer: &mut Writer<Cursor<Vec<u8>>>, r: NodeRef) -> Result<()> {
        match &self.nodes[r].kind {
            NodeKind::Text(t) => {
                writer
                    .write_event(Event::Text(BytesText::new(t)))
                    .map_err(|e| OoxmlError::SerializationError(e.to_string()))?;
            }
            NodeKind::Element { name, attrs } => {
                let children = &self.nodes[r].children;
                if children.is_empty() {
                    let mut start = BytesStart::new(name.as_str());
                    start.extend_attributes(attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    writer
                        .write_event(Event::Empty(start))
                        .map_err(|e| OoxmlError::SerializationError(e.to_string()))?;
                } else {
                    let mut start = BytesStart::new(name.as_str());
                    start.extend_attributes(attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    writer
                        .write_event(Event::Start(start))
                        .map_err(|e| OoxmlError::SerializationError(e.to_string()))?;
                    for &child in children {
                        self.write_node(writer, child)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(|e| OoxmlError::SerializationError(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    /// Serialize the whole document starting at `self.root`.
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let root = self
            .root
            .ok_or_else(|| OoxmlError::SerializationError("arena has no root".to_string()))?;
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(|e| OoxmlError::SerializationError(e.to_string()))?;
        self.write_node(&mut writer, root)?;
        Ok(writer.into_inner().into_inner())
    }

    /// Parse a full XML document into a fresh arena, with `root` set to the
    /// document element.
    pub fn parse(bytes: &[u8]) -> Result<Arena> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        let mut arena = Arena::new();
        let mut stack: Vec<NodeRef> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let attrs = e
                        .attributes()
                        .filter_map(|a| a.ok())
                        .map(|a| {
                            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                            let value = a.unescape_value().unwrap_or_default().into_owned();
                            (key, value)
                        })
                        .collect();
                    let node = arena.alloc_element(name, attrs);
                    if let Some(&parent) = stack.last() {
                        arena.append_child(parent, node);
                    }
                    stack.push(node);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let attrs = e
                        .attributes()
                        .filter_map(|a| a.ok())
                        .map(|a| {
                            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                            let value = a.unescape_value().unwrap_or_default().into_owned();
                            (key, value)
                        })
                        .collect();
                    let node = arena.alloc_element(name, attrs);
                    if let Some(&parent) = stack.last() {
                        arena.append_child(parent, node);
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    if let Some(&parent) = stack.last() {
                        if !text.is_empty() {
                            let node = arena.alloc_text(text);
                            arena.append_child(parent, node);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if let Some(&parent) = stack.last() {
                        let node = arena.alloc_text(text);
                        arena.append_child(parent, node);
                    }
                }
                Ok(Event::End(_)) => {
                    if let Some(finished) = stack.pop() {
                        if stack.is_empty() {
                            arena.root = Some(finished);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(OoxmlError::MalformedXml(e.to_string())),
            }
            buf.clear();
        }

        if arena.root.is_none() {
            return Err(OoxmlError::MalformedXml("no root element found".to_string()));
        }
        Ok(arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name("w:p"), "p");
        assert_eq!(local_name("p"), "p");
    }

    #[test]
    fn parse_round_trips_simple_document() {
        let xml = br#"<w:document xmlns:w="ns"><w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p></w:body></w:document>"#;
        let arena = Arena::parse(xml).unwrap();
        let root = arena.root.unwrap();
        assert!(arena.is_element(root, "document"));
        let body = arena.find_child(root, "body").unwrap();
        let p = arena.find_child(body, "p").unwrap();
        let r = arena.find_child(p, "r").unwrap();
        let t = arena.find_child(r, "t").unwrap();
        assert_eq!(arena.text_content(t), "Hello");
    }

    #[test]
    fn detach_and_reattach_preserves_subtree() {
        let xml = br#"<root><a><b/></a></root>"#;
        let mut arena = Arena::parse(xml).unwrap();
        let root = arena.root.unwrap();
        let a = arena.find_child(root, "a").unwrap();
        let b = arena.find_child(a, "b").unwrap();
        arena.detach(b);
        assert!(arena.find_child(a, "b").is_none());
        arena.append_child(root, b);
        assert!(arena.children(root).contains(&b));
        assert_eq!(arena.parent(b), Some(root));
    }

    #[test]
    fn clone_subtree_is_independent_copy() {
        let xml = br#"<root><r><t>abc</t></r></root>"#;
        let mut arena = Arena::parse(xml).unwrap();
        let root = arena.root.unwrap();
        let r = arena.find_child(root, "r").unwrap();
        let clone = arena.clone_subtree(r);
        assert_ne!(clone, r);
        assert_eq!(arena.text_content(clone), arena.text_content(r));
    }

    #[test]
    fn serialize_subtree_round_trips_attrs() {
        let xml = br#"<root><rPr><b val="1"/></rPr></root>"#;
        let arena = Arena::parse(xml).unwrap();
        let root = arena.root.unwrap();
        let rpr = arena.find_child(root, "rPr").unwrap();
        let out = arena.serialize_subtree(rpr).unwrap();
        assert!(out.contains("<rPr>"));
        assert!(out.contains("val=\"1\""));
    }
}
