//! Position Tracker
//!
//! Reconciles a depth-indexed frame stack against each cursor event, so the
//! current node's ancestor chain and sibling ordinals are always known
//! without building a tree.

use super::frame::{DepthFrame, SiblingTally};
use super::path::build_path;
use crate::error::{Error, Result};
use crate::reader::NodeEvent;
use tracing::warn;

/// Ancestor/sibling state for one parse session
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    frames: Vec<DepthFrame>,
    tallies: Vec<SiblingTally>,
    previous_depth: usize,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the next tracked event into the stack
    ///
    /// After a successful call the stack holds exactly `event.depth + 1`
    /// frames and the last one describes `event`. A descent that skips a
    /// level is rejected, so a decrease can only land outside the recorded
    /// range if the stack was already inconsistent; it is checked anyway.
    pub fn advance(&mut self, event: &NodeEvent) -> Result<&DepthFrame> {
        let depth = event.depth;

        if depth < self.previous_depth {
            if self.frames.len() < depth + 1 || self.tallies.len() < depth + 1 {
                return Err(self.reject(depth));
            }
            self.frames.truncate(depth + 1);
            self.tallies.truncate(depth + 1);
        }

        if depth > self.frames.len() {
            return Err(self.reject(depth));
        }
        if depth == self.tallies.len() {
            self.tallies.push(SiblingTally::default());
        }

        let sibling_index = self.tallies[depth].bump(event.kind, &event.local_name);
        match self.frames.get_mut(depth) {
            Some(frame) if frame.matches(event) => frame.sibling_index = sibling_index,
            Some(frame) => *frame = DepthFrame::new(event.local_name.as_str(), event.kind, sibling_index),
            None => self
                .frames
                .push(DepthFrame::new(event.local_name.as_str(), event.kind, sibling_index)),
        }

        self.previous_depth = depth;
        Ok(&self.frames[depth])
    }

    fn reject(&self, depth: usize) -> Error {
        warn!(
            depth,
            previous = self.previous_depth,
            recorded = self.frames.len(),
            "cursor depth outside the recorded ancestor chain"
        );
        Error::StructuralIntegrity {
            depth,
            recorded: self.frames.len(),
        }
    }

    /// Render the current position as a path
    pub fn path(&self, with_sibling_index: bool) -> Result<String> {
        build_path(&self.frames, self.tallies.len(), with_sibling_index)
    }

    pub fn frames(&self) -> &[DepthFrame] {
        &self.frames
    }

    pub fn current(&self) -> Option<&DepthFrame> {
        self.frames.last()
    }

    /// Names of the enclosing elements, outermost first
    pub fn ancestor_names(&self) -> impl Iterator<Item = &str> {
        let len = self.frames.len().saturating_sub(1);
        self.frames[..len].iter().map(|frame| frame.local_name.as_str())
    }

    pub fn depth(&self) -> usize {
        self.previous_depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::NodeKind;

    fn feed(tracker: &mut PositionTracker, events: &[NodeEvent]) {
        for event in events {
            tracker.advance(event).unwrap();
        }
    }

    #[test]
    fn test_consecutive_siblings() {
        let mut tracker = PositionTracker::new();
        feed(
            &mut tracker,
            &[NodeEvent::element(0, "a"), NodeEvent::element(1, "b"), NodeEvent::element(1, "b")],
        );
        assert_eq!(tracker.current(), Some(&DepthFrame::new("b", NodeKind::Element, 2)));
        assert_eq!(tracker.frames().len(), 2);
    }

    #[test]
    fn test_interleaved_siblings_keep_count() {
        let mut tracker = PositionTracker::new();
        feed(
            &mut tracker,
            &[
                NodeEvent::element(0, "a"),
                NodeEvent::element(1, "b"),
                NodeEvent::element(1, "c"),
                NodeEvent::element(1, "b"),
            ],
        );
        assert_eq!(tracker.path(true).unwrap(), "/a/b[2]");
    }

    #[test]
    fn test_counts_restart_under_new_parent() {
        let mut tracker = PositionTracker::new();
        feed(
            &mut tracker,
            &[
                NodeEvent::element(0, "a"),
                NodeEvent::element(1, "b"),
                NodeEvent::element(2, "x"),
                NodeEvent::element(2, "x"),
                NodeEvent::element(1, "b"),
                NodeEvent::element(2, "x"),
            ],
        );
        assert_eq!(tracker.path(true).unwrap(), "/a/b[2]/x[1]");
        assert_eq!(tracker.frames().len(), 3);
    }

    #[test]
    fn test_decrease_truncates() {
        let mut tracker = PositionTracker::new();
        feed(
            &mut tracker,
            &[
                NodeEvent::element(0, "a"),
                NodeEvent::element(1, "b"),
                NodeEvent::element(2, "c"),
                NodeEvent::element(3, "d"),
                NodeEvent::element(1, "e"),
            ],
        );
        assert_eq!(tracker.path(false).unwrap(), "/a/e");
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_decrease_beyond_recorded_range() {
        let mut tracker = PositionTracker::new();
        tracker.advance(&NodeEvent::element(0, "a")).unwrap();
        tracker.previous_depth = 5;

        let err = tracker.advance(&NodeEvent::element(3, "x")).unwrap_err();
        assert!(matches!(err, Error::StructuralIntegrity { depth: 3, recorded: 1 }));
    }

    #[test]
    fn test_descent_gap_rejected() {
        let mut tracker = PositionTracker::new();
        tracker.advance(&NodeEvent::element(0, "a")).unwrap();
        let err = tracker.advance(&NodeEvent::element(2, "c")).unwrap_err();
        assert!(matches!(err, Error::StructuralIntegrity { depth: 2, .. }));
    }

    #[test]
    fn test_attribute_and_text_frames() {
        let mut tracker = PositionTracker::new();
        feed(
            &mut tracker,
            &[NodeEvent::element(0, "a"), NodeEvent::new(1, NodeKind::Attribute, "id")],
        );
        assert_eq!(tracker.path(false).unwrap(), "/a[@id]");

        tracker.advance(&NodeEvent::text(1)).unwrap();
        assert_eq!(tracker.path(false).unwrap(), "/a/text()");
        assert_eq!(tracker.ancestor_names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_mismatched_components() {
        let mut tracker = PositionTracker::new();
        tracker.advance(&NodeEvent::element(0, "a")).unwrap();
        tracker.tallies.push(SiblingTally::default());
        assert!(matches!(
            tracker.path(false),
            Err(Error::EmptyReader { frames: 1, tallies: 2 })
        ));
    }
}
