//! Depth Frames
//!
//! One frame per nesting level, describing the node most recently seen at
//! that level, plus the per-level sibling tallies.

use crate::reader::{NodeEvent, NodeKind};
use std::collections::HashMap;

/// The node last seen at one depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub local_name: String,
    pub kind: NodeKind,
    /// 1-based ordinal among earlier siblings with the same kind and name
    pub sibling_index: usize,
}

impl DepthFrame {
    pub fn new(local_name: impl Into<String>, kind: NodeKind, sibling_index: usize) -> Self {
        DepthFrame {
            local_name: local_name.into(),
            kind,
            sibling_index,
        }
    }

    /// Same node identity as the event (name and kind)
    #[inline]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.kind == event.kind && self.local_name == event.local_name
    }
}

/// How many siblings of each (kind, name) were seen under one parent
#[derive(Debug, Clone, Default)]
pub struct SiblingTally {
    counts: HashMap<(NodeKind, String), usize>,
}

impl SiblingTally {
    /// Count one more sibling and return its 1-based ordinal
    pub fn bump(&mut self, kind: NodeKind, local_name: &str) -> usize {
        let key = (kind, local_name.to_string());
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, kind: NodeKind, local_name: &str) -> usize {
        self.counts
            .get(&(kind, local_name.to_string()))
            .copied()
            .unwrap_or(0)
    }
}
