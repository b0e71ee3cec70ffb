//! Fragment Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of fragment node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Fragment root (always id 0)
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

impl NodeType {
    /// Text-bearing leaf (text, CDATA, comment)
    #[inline]
    pub fn is_character_data(self) -> bool {
        matches!(self, NodeType::Text | NodeType::CData | NodeType::Comment)
    }
}

/// A node in the fragment arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeType,
    /// Parent node (None for the document node)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String pool id of the element name or PI target
    pub name_id: u32,
    /// String pool id of the character content or PI data
    pub value_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u16,
}

impl XmlNode {
    fn blank(kind: NodeType, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        Self::blank(NodeType::Document, None)
    }

    pub fn element(name_id: u32, parent: NodeId, attr_start: u32) -> Self {
        XmlNode {
            name_id,
            attr_start,
            ..Self::blank(NodeType::Element, Some(parent))
        }
    }

    /// Text, CDATA or comment leaf
    pub fn character(kind: NodeType, value_id: u32, parent: NodeId) -> Self {
        XmlNode {
            value_id,
            ..Self::blank(kind, Some(parent))
        }
    }

    pub fn processing_instruction(name_id: u32, value_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..Self::blank(NodeType::ProcessingInstruction, Some(parent))
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeType::Element
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone, Copy)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeType::Document);
        assert!(doc.parent.is_none());
        assert!(!doc.has_children());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, 0, 4);
        assert!(elem.is_element());
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert_eq!(elem.attr_start, 4);
    }

    #[test]
    fn test_character_kinds() {
        assert!(NodeType::CData.is_character_data());
        assert!(NodeType::Comment.is_character_data());
        assert!(!NodeType::ProcessingInstruction.is_character_data());
        let text = XmlNode::character(NodeType::Text, 3, 1);
        assert_eq!(text.value_id, 3);
    }
}
