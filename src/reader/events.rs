//! Node Event Types
//!
//! Owned snapshots a cursor reports on each advance, plus the opaque subtree
//! handed to the fragment builder on expansion.

use std::fmt;

/// Kind of node the cursor is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Attribute,
    Text,
    CData,
    ProcessingInstruction,
    Comment,
    /// Whitespace-only text between markup
    Whitespace,
    /// Closing tag of a non-empty element
    EndElement,
}

impl NodeKind {
    /// Kinds the position tracker and the dispatch loop act on
    ///
    /// Everything else is reported by cursors but skipped by the core.
    #[inline]
    pub fn is_tracked(self) -> bool {
        matches!(
            self,
            NodeKind::Element | NodeKind::Attribute | NodeKind::Text | NodeKind::CData | NodeKind::Comment
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::ProcessingInstruction => "processing-instruction",
            NodeKind::Comment => "comment",
            NodeKind::Whitespace => "whitespace",
            NodeKind::EndElement => "end-element",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cursor step: where the cursor is and what it is positioned on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    /// Nesting level; root-level nodes are at depth 0
    pub depth: usize,
    pub kind: NodeKind,
    /// Qualified name (prefix included); empty for character data
    pub name: String,
    /// Name after the namespace prefix; empty for character data
    pub local_name: String,
}

impl NodeEvent {
    pub fn new(depth: usize, kind: NodeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let local_name = local_part(&name).to_string();
        NodeEvent {
            depth,
            kind,
            name,
            local_name,
        }
    }

    pub fn element(depth: usize, name: impl Into<String>) -> Self {
        Self::new(depth, NodeKind::Element, name)
    }

    pub fn text(depth: usize) -> Self {
        Self::new(depth, NodeKind::Text, String::new())
    }
}

/// Attribute of the current element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttribute {
    pub name: String,
    pub value: String,
}

impl NodeAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        NodeAttribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// Split off a namespace prefix, if any
pub(crate) fn local_part(name: &str) -> &str {
    match name.find(':') {
        Some(colon) => &name[colon + 1..],
        None => name,
    }
}

/// Flattened markup of one expanded node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeEvent {
    Open { name: String, attributes: Vec<NodeAttribute> },
    Close,
    Text(String),
    CData(String),
    Comment(String),
    Instruction { target: String, data: String },
}

/// The current node and everything below it, as produced by a cursor
///
/// Opaque to the dispatch core; only the fragment builder reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    events: Vec<SubtreeEvent>,
}

impl Subtree {
    /// Build from a balanced event list (every `Open` matched by a `Close`)
    pub fn new(events: Vec<SubtreeEvent>) -> Self {
        Subtree { events }
    }

    pub fn events(&self) -> &[SubtreeEvent] {
        &self.events
    }

    /// True when the subtree is a single piece of character data
    /// (text, CDATA or comment) with no enclosing element
    pub fn is_character_data(&self) -> bool {
        matches!(
            self.events.as_slice(),
            [SubtreeEvent::Text(_) | SubtreeEvent::CData(_) | SubtreeEvent::Comment(_)]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_split() {
        let event = NodeEvent::element(2, "svg:rect");
        assert_eq!(event.name, "svg:rect");
        assert_eq!(event.local_name, "rect");
        assert_eq!(NodeAttribute::new("xlink:href", "#a").local_name(), "href");
    }

    #[test]
    fn test_tracked_kinds() {
        assert!(NodeKind::Element.is_tracked());
        assert!(NodeKind::Attribute.is_tracked());
        assert!(!NodeKind::Whitespace.is_tracked());
        assert!(!NodeKind::EndElement.is_tracked());
        assert!(!NodeKind::ProcessingInstruction.is_tracked());
    }

    #[test]
    fn test_character_data_subtree() {
        assert!(Subtree::new(vec![SubtreeEvent::Text("x".into())]).is_character_data());
        let element = Subtree::new(vec![
            SubtreeEvent::Open { name: "a".into(), attributes: vec![] },
            SubtreeEvent::Close,
        ]);
        assert!(!element.is_character_data());
    }
}
