//! XML Fragment - Arena-based DOM of one expanded node
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names and content

use super::node::{NodeId, NodeType, XmlAttribute, XmlNode};
use super::strings::StringPool;
use crate::core::entities::{encode_attribute, encode_text};
use crate::reader::{Subtree, SubtreeEvent};

/// Element name used to wrap bare character data with no named parent
pub const DEFAULT_CONTAINER: &str = "root";

/// A small document holding one expanded node and its descendants
#[derive(Debug)]
pub struct Fragment {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<XmlNode>,
    /// Arena of attributes
    attributes: Vec<XmlAttribute>,
    /// Interned strings
    strings: StringPool,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    /// Create an empty fragment (document node only)
    pub fn new() -> Self {
        Fragment {
            nodes: vec![XmlNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
        }
    }

    /// Import an expanded subtree
    ///
    /// Bare character data cannot stand alone as a document, so it is
    /// wrapped in an element named `container`, or [`DEFAULT_CONTAINER`]
    /// when that is absent or empty.
    pub fn from_subtree(subtree: &Subtree, container: Option<&str>) -> Self {
        let mut fragment = Fragment::new();
        let mut stack: Vec<NodeId> = vec![0];

        if subtree.is_character_data() {
            let name = container.filter(|name| !name.is_empty()).unwrap_or(DEFAULT_CONTAINER);
            let id = fragment.append_element(0, name, &[]);
            stack.push(id);
        }

        for event in subtree.events() {
            let parent = stack.last().copied().unwrap_or(0);
            match event {
                SubtreeEvent::Open { name, attributes } => {
                    let pairs: Vec<(&str, &str)> = attributes
                        .iter()
                        .map(|attr| (attr.name.as_str(), attr.value.as_str()))
                        .collect();
                    let id = fragment.append_element(parent, name, &pairs);
                    stack.push(id);
                }
                SubtreeEvent::Close => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                SubtreeEvent::Text(text) => {
                    fragment.append_character(parent, NodeType::Text, text);
                }
                SubtreeEvent::CData(text) => {
                    fragment.append_character(parent, NodeType::CData, text);
                }
                SubtreeEvent::Comment(text) => {
                    fragment.append_character(parent, NodeType::Comment, text);
                }
                SubtreeEvent::Instruction { target, data } => {
                    let name_id = fragment.strings.intern(target);
                    let value_id = fragment.strings.intern(data);
                    fragment.push_node(XmlNode::processing_instruction(name_id, value_id, parent), parent);
                }
            }
        }

        fragment
    }

    /// Append an element with attributes under `parent`
    pub fn append_element(&mut self, parent: NodeId, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let name_id = self.strings.intern(name);
        let attr_start = self.attributes.len() as u32;
        for (attr_name, attr_value) in attributes {
            let name_id = self.strings.intern(attr_name);
            let value_id = self.strings.intern(attr_value);
            self.attributes.push(XmlAttribute { name_id, value_id });
        }

        let mut node = XmlNode::element(name_id, parent, attr_start);
        node.attr_count = attributes.len().min(u16::MAX as usize) as u16;
        self.push_node(node, parent)
    }

    /// Append a text, CDATA or comment node under `parent`
    pub fn append_character(&mut self, parent: NodeId, kind: NodeType, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push_node(XmlNode::character(kind, value_id, parent), parent)
    }

    fn push_node(&mut self, node: XmlNode, parent: NodeId) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// The document node (always id 0)
    pub fn document_id(&self) -> NodeId {
        0
    }

    /// First element child of the document node
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.children(0).find(|&id| self.nodes[id as usize].is_element())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get_node(id).map(|node| node.kind)
    }

    /// Element name or PI target
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeType::Element | NodeType::ProcessingInstruction => self.strings.get(node.name_id),
            _ => None,
        }
    }

    /// Element name without its namespace prefix
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.node_name(id)?;
        Some(name.find(':').map_or(name, |pos| &name[pos + 1..]))
    }

    /// Content of a character-data node or PI data
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeType::Text | NodeType::CData | NodeType::Comment | NodeType::ProcessingInstruction => {
                self.strings.get(node.value_id)
            }
            NodeType::Document | NodeType::Element => None,
        }
    }

    /// Concatenated text and CDATA content of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        let own = std::iter::once(id);
        for node_id in own.chain(self.descendants(id)) {
            if let Some(node) = self.get_node(node_id) {
                if matches!(node.kind, NodeType::Text | NodeType::CData) {
                    text.push_str(self.strings.get(node.value_id).unwrap_or_default());
                }
            }
        }
        text
    }

    fn attribute_slice(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                &self.attributes[start..end]
            }
            _ => &[],
        }
    }

    /// Attribute value by qualified name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_slice(id)
            .iter()
            .find(|attr| self.strings.get(attr.name_id) == Some(name))
            .and_then(|attr| self.strings.get(attr.value_id))
    }

    /// All attribute names and values of an element, in document order
    pub fn attributes(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attribute_slice(id)
            .iter()
            .filter_map(|attr| Some((self.strings.get(attr.name_id)?, self.strings.get(attr.value_id)?)))
            .collect()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node (depth-first, document order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        self.push_children_reversed(id, &mut stack);
        DescendantIter { doc: self, stack }
    }

    fn push_children_reversed(&self, id: NodeId, stack: &mut Vec<NodeId>) {
        let mut child = self.get_node(id).and_then(|n| n.last_child);
        while let Some(child_id) = child {
            stack.push(child_id);
            child = self.get_node(child_id).and_then(|n| n.prev_sibling);
        }
    }

    /// Total number of nodes, the document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serialize the whole fragment (no XML declaration)
    pub fn to_xml(&self) -> String {
        self.node_to_xml(0)
    }

    /// Serialize one node and its descendants
    pub fn node_to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let name = self.strings.get(node.name_id).unwrap_or_default();
        let value = self.strings.get(node.value_id).unwrap_or_default();

        match node.kind {
            NodeType::Document => {
                for child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeType::Element => {
                out.push('<');
                out.push_str(name);
                for (attr_name, attr_value) in self.attributes(id) {
                    out.push(' ');
                    out.push_str(attr_name);
                    out.push_str("=\"");
                    out.push_str(&encode_attribute(attr_value));
                    out.push('"');
                }
                if !node.has_children() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            NodeType::Text => out.push_str(&encode_text(value)),
            NodeType::CData => {
                out.push_str("<![CDATA[");
                out.push_str(value);
                out.push_str("]]>");
            }
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(value);
                out.push_str("-->");
            }
            NodeType::ProcessingInstruction => {
                out.push_str("<?");
                out.push_str(name);
                if !value.is_empty() {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push_str("?>");
            }
        }
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Fragment,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d Fragment,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.doc.push_children_reversed(current, &mut self.stack);
        Some(current)
    }
}
