//! Dispatch Loop
//!
//! A session drives one cursor through the position tracker and hands each
//! tracked node to the handler its position resolves to. Resolution tries,
//! in order and building each candidate only when the previous one missed:
//!
//! 1. the bare local name (`b`)
//! 2. the unindexed path (`/a/b`)
//! 3. the indexed path (`/a/b[2]`)

use super::handler::{Control, Handler};
use super::registry::Registry;
use crate::dom::{Fragment, PathQuery, Selection};
use crate::error::{Error, Result};
use crate::reader::{Cursor, NodeAttribute, NodeEvent, NodeKind};
use crate::track::PositionTracker;
use tracing::{debug, trace, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, `parse` not called yet
    Idle,
    Running,
    /// A handler returned `Stop`; `parse` resumes from the next node
    Stopped,
    /// The cursor reported end of stream
    Exhausted,
    /// Tracking state is no longer trustworthy
    Failed,
}

/// How a parse run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Stopped,
    Exhausted,
}

/// One parse run over one cursor
pub struct Session<'s, 'h, C: Cursor> {
    registry: &'s mut Registry<'h>,
    cursor: &'s mut C,
    tracker: PositionTracker,
    state: SessionState,
}

impl<'s, 'h, C: Cursor> Session<'s, 'h, C> {
    pub fn new(registry: &'s mut Registry<'h>, cursor: &'s mut C) -> Self {
        Session {
            registry,
            cursor,
            tracker: PositionTracker::new(),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Path of the last tracked node
    pub fn path(&self, with_sibling_index: bool) -> Result<String> {
        if self.state == SessionState::Failed {
            return Err(Error::SessionFailed);
        }
        self.tracker.path(with_sibling_index)
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Pull nodes and dispatch them until a handler stops the run or the
    /// cursor runs out
    pub fn parse(&mut self) -> Result<ParseOutcome> {
        match self.state {
            SessionState::Failed => return Err(Error::SessionFailed),
            SessionState::Exhausted => return Ok(ParseOutcome::Exhausted),
            SessionState::Idle | SessionState::Running | SessionState::Stopped => {}
        }
        if self.registry.is_empty() {
            return Err(Error::EmptyRegistry);
        }

        debug!(
            resumed = self.state == SessionState::Stopped,
            callbacks = self.registry.len(),
            "parse session started"
        );
        self.state = SessionState::Running;

        loop {
            let event = match self.cursor.advance() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!("cursor exhausted");
                    self.state = SessionState::Exhausted;
                    return Ok(ParseOutcome::Exhausted);
                }
                Err(err) => {
                    warn!(position = err.position, error = %err.message, "cursor failed");
                    self.state = SessionState::Failed;
                    return Err(err.into());
                }
            };

            if !event.kind.is_tracked() {
                trace!(kind = %event.kind, depth = event.depth, "skipping untracked node");
                continue;
            }

            let control = match self.step(&event) {
                Ok(control) => control,
                Err(err) => {
                    if err.poisons_session() {
                        self.state = SessionState::Failed;
                    }
                    return Err(err);
                }
            };

            if control.is_stop() {
                debug!(kind = %event.kind, depth = event.depth, "handler requested stop");
                self.state = SessionState::Stopped;
                return Ok(ParseOutcome::Stopped);
            }
        }
    }

    fn step(&mut self, event: &NodeEvent) -> Result<Control> {
        self.tracker.advance(event)?;
        let kind = event.kind;

        if let Some(handler) = self.registry.lookup(kind, &[event.local_name.as_str()]) {
            let view = NodeView::new(event, &self.tracker, &*self.cursor);
            return Ok(dispatch(handler, &view, &event.local_name));
        }

        let unindexed = self.tracker.path(false)?;
        if let Some(handler) = self.registry.lookup(kind, &[unindexed.as_str()]) {
            let view = NodeView::new(event, &self.tracker, &*self.cursor);
            return Ok(dispatch(handler, &view, &unindexed));
        }

        let indexed = self.tracker.path(true)?;
        match self.registry.lookup(kind, &[indexed.as_str()]) {
            Some(handler) => {
                let view = NodeView::new(event, &self.tracker, &*self.cursor);
                Ok(dispatch(handler, &view, &indexed))
            }
            None => Ok(Control::Continue),
        }
    }
}

fn dispatch(handler: &mut (dyn Handler + '_), view: &NodeView<'_>, pattern: &str) -> Control {
    trace!(kind = %view.kind(), depth = view.depth(), pattern, "dispatching");
    handler.handle(view)
}

/// Read-only view of the node a handler was invoked for
pub struct NodeView<'v> {
    event: &'v NodeEvent,
    tracker: &'v PositionTracker,
    cursor: &'v dyn Cursor,
}

impl<'v> NodeView<'v> {
    pub(crate) fn new(event: &'v NodeEvent, tracker: &'v PositionTracker, cursor: &'v dyn Cursor) -> Self {
        NodeView { event, tracker, cursor }
    }

    pub fn depth(&self) -> usize {
        self.event.depth
    }

    pub fn kind(&self) -> NodeKind {
        self.event.kind
    }

    pub fn local_name(&self) -> &'v str {
        &self.event.local_name
    }

    /// Qualified name, prefix included
    pub fn name(&self) -> &'v str {
        &self.event.name
    }

    /// Character content, attribute value or PI data
    pub fn value(&self) -> Option<&'v str> {
        self.cursor.value()
    }

    pub fn attributes(&self) -> &'v [NodeAttribute] {
        self.cursor.attributes()
    }

    pub fn attribute(&self, name: &str) -> Option<&'v str> {
        self.attributes()
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Current position as a path
    pub fn path(&self, with_sibling_index: bool) -> Result<String> {
        self.tracker.path(with_sibling_index)
    }

    /// Materialize the current node as a standalone fragment
    ///
    /// Character data is wrapped in an element named after its parent.
    /// `Ok(None)` when the cursor cannot expand this node.
    pub fn expand(&self) -> Result<Option<Fragment>> {
        let Some(subtree) = self.cursor.expand()? else {
            return Ok(None);
        };
        let container = self.tracker.ancestor_names().filter(|name| !name.is_empty()).last();
        Ok(Some(Fragment::from_subtree(&subtree, container)))
    }

    /// The expanded fragment serialized as XML
    pub fn expand_string(&self) -> Result<Option<String>> {
        Ok(self.expand()?.map(|fragment| fragment.to_xml()))
    }

    /// Evaluate a path query against the expanded fragment
    pub fn expand_select(&self, path: &str) -> Result<Option<Selection>> {
        let query = PathQuery::parse(path)?;
        let Some(fragment) = self.expand()? else {
            return Ok(None);
        };
        let nodes = query.evaluate(&fragment);
        Ok(Some(Selection::new(fragment, nodes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::ParseError;
    use crate::reader::XmlCursor;
    use std::cell::RefCell;

    /// Replays a fixed event list
    struct Scripted {
        events: std::vec::IntoIter<std::result::Result<NodeEvent, ParseError>>,
        advanced: usize,
    }

    impl Scripted {
        fn new(events: Vec<std::result::Result<NodeEvent, ParseError>>) -> Self {
            Scripted {
                events: events.into_iter(),
                advanced: 0,
            }
        }
    }

    impl Cursor for Scripted {
        fn advance(&mut self) -> std::result::Result<Option<NodeEvent>, ParseError> {
            self.advanced += 1;
            self.events.next().transpose()
        }
    }

    #[test]
    fn test_empty_registry_before_advance() {
        let mut registry = Registry::new();
        let mut cursor = Scripted::new(vec![Ok(NodeEvent::element(0, "a"))]);
        let mut session = Session::new(&mut registry, &mut cursor);
        assert!(matches!(session.parse(), Err(Error::EmptyRegistry)));
        assert_eq!(session.state(), SessionState::Idle);
        drop(session);
        assert_eq!(cursor.advanced, 0);
    }

    #[test]
    fn test_gap_fails_session() {
        let mut registry = Registry::new();
        registry.register("a", NodeKind::Element, |_: &NodeView<'_>| Control::Continue).unwrap();
        let mut cursor = Scripted::new(vec![Ok(NodeEvent::element(0, "a")), Ok(NodeEvent::element(2, "c"))]);
        let mut session = Session::new(&mut registry, &mut cursor);

        assert!(matches!(session.parse(), Err(Error::StructuralIntegrity { depth: 2, .. })));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(session.parse(), Err(Error::SessionFailed)));
        assert!(matches!(session.path(false), Err(Error::SessionFailed)));
    }

    #[test]
    fn test_cursor_error_fails_session() {
        let mut registry = Registry::new();
        registry.register("a", NodeKind::Element, |_: &NodeView<'_>| Control::Continue).unwrap();
        let mut cursor = Scripted::new(vec![
            Ok(NodeEvent::element(0, "a")),
            Err(ParseError::new("Unclosed tag: <a>", 3)),
        ]);
        let mut session = Session::new(&mut registry, &mut cursor);
        assert!(matches!(session.parse(), Err(Error::Cursor(_))));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_untracked_kinds_are_skipped() {
        let seen = RefCell::new(Vec::new());
        let mut registry = Registry::new();
        registry
            .register("/a/text()", NodeKind::Text, |node: &NodeView<'_>| {
                seen.borrow_mut().push(node.value().unwrap_or_default().to_string());
                Control::Continue
            })
            .unwrap();

        let mut cursor = XmlCursor::new(b"<a> <?pi x?>hi<!--c--></a>");
        let mut session = Session::new(&mut registry, &mut cursor);
        assert_eq!(session.parse().unwrap(), ParseOutcome::Exhausted);
        assert_eq!(session.parse().unwrap(), ParseOutcome::Exhausted);
        drop(session);
        drop(registry);
        assert_eq!(seen.into_inner(), vec!["hi"]);
    }

    #[test]
    fn test_resume_after_stop() {
        let seen = RefCell::new(Vec::new());
        let mut registry = Registry::new();
        registry
            .register("b", NodeKind::Element, |node: &NodeView<'_>| {
                seen.borrow_mut().push(node.path(true).unwrap_or_default());
                Control::Stop
            })
            .unwrap();

        let mut cursor = XmlCursor::new(b"<a><b/><c/><b/></a>");
        let mut session = Session::new(&mut registry, &mut cursor);
        assert_eq!(session.parse().unwrap(), ParseOutcome::Stopped);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.parse().unwrap(), ParseOutcome::Stopped);
        assert_eq!(session.parse().unwrap(), ParseOutcome::Exhausted);
        drop(session);
        drop(registry);
        assert_eq!(seen.into_inner(), vec!["/a/b[1]", "/a/b[2]"]);
    }

    #[test]
    fn test_view_accessors() {
        let captured = RefCell::new(None);
        let mut registry = Registry::new();
        registry
            .register("item", NodeKind::Element, |node: &NodeView<'_>| {
                *captured.borrow_mut() = Some((
                    node.depth(),
                    node.kind(),
                    node.name().to_string(),
                    node.attribute("id").map(str::to_string),
                    node.attributes().len(),
                    node.value().is_none(),
                ));
                Control::Stop
            })
            .unwrap();

        let mut cursor = XmlCursor::new(b"<list><x:item id=\"7\" k=\"v\"/></list>");
        Session::new(&mut registry, &mut cursor).parse().unwrap();
        drop(registry);
        // Bare names are matched against the local name
        assert_eq!(
            captured.into_inner(),
            Some((1, NodeKind::Element, "x:item".to_string(), Some("7".to_string()), 2, true))
        );
    }

    #[test]
    fn test_expand_from_handler() {
        let out = RefCell::new(Vec::new());
        let mut registry = Registry::new();
        registry
            .register("/a/b", NodeKind::Element, |node: &NodeView<'_>| {
                out.borrow_mut().push(node.expand_string().unwrap().unwrap_or_default());
                Control::Continue
            })
            .unwrap();
        registry
            .register("/a/b/text()", NodeKind::Text, |node: &NodeView<'_>| {
                out.borrow_mut().push(node.expand_string().unwrap().unwrap_or_default());
                Control::Continue
            })
            .unwrap();

        let mut cursor = XmlCursor::new(b"<a><b k=\"1\">hi<i/></b></a>");
        Session::new(&mut registry, &mut cursor).parse().unwrap();
        drop(registry);
        assert_eq!(out.into_inner(), vec!["<b k=\"1\">hi<i/></b>", "<b>hi</b>"]);
    }
}
