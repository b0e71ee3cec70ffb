//! Callback Registry
//!
//! Maps (node kind, pattern) keys to handlers. A pattern is a bare local
//! name (`b`), an unindexed path (`/a/b`) or an indexed path (`/a/b[2]`);
//! the registry treats all three as opaque strings.

use super::handler::{Control, Handler};
use super::session::NodeView;
use crate::error::{Error, Result};
use crate::reader::NodeKind;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Handlers keyed by node kind, then pattern
#[derive(Default)]
pub struct Registry<'h> {
    callbacks: HashMap<NodeKind, HashMap<String, Box<dyn Handler + 'h>>>,
}

impl<'h> Registry<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a closure to `(kind, pattern)`
    pub fn register<F>(&mut self, pattern: impl Into<String>, kind: NodeKind, handler: F) -> Result<()>
    where
        F: FnMut(&NodeView<'_>) -> Control + 'h,
    {
        self.register_handler(pattern, kind, handler)
    }

    /// Bind any [`Handler`] to `(kind, pattern)`
    ///
    /// Fails with `RegistrationConflict` if the key is taken, leaving the
    /// existing binding in place, and with `NotCallable` if the handler
    /// reports it cannot be invoked.
    pub fn register_handler<H>(&mut self, pattern: impl Into<String>, kind: NodeKind, handler: H) -> Result<()>
    where
        H: Handler + 'h,
    {
        let pattern = pattern.into();
        if self.contains(kind, &pattern) {
            return Err(Error::RegistrationConflict { pattern, kind });
        }
        if !handler.is_callable() {
            return Err(Error::NotCallable { pattern, kind });
        }

        debug!(%kind, pattern = %pattern, "callback registered");
        self.callbacks
            .entry(kind)
            .or_default()
            .insert(pattern, Box::new(handler));
        Ok(())
    }

    /// Remove the binding for `(kind, pattern)`
    pub fn unregister(&mut self, pattern: &str, kind: NodeKind) -> Result<()> {
        let removed = self
            .callbacks
            .get_mut(&kind)
            .and_then(|slot| slot.remove(pattern));
        if removed.is_none() {
            return Err(Error::UnknownCallback {
                pattern: pattern.to_string(),
                kind,
            });
        }

        if self.callbacks.get(&kind).is_some_and(HashMap::is_empty) {
            self.callbacks.remove(&kind);
        }
        debug!(%kind, pattern, "callback unregistered");
        Ok(())
    }

    /// First candidate, in order, that is bound for `kind`
    pub fn lookup(&mut self, kind: NodeKind, candidates: &[&str]) -> Option<&mut (dyn Handler + 'h)> {
        let slot = self.callbacks.get_mut(&kind)?;
        let pattern = candidates.iter().find(|pattern| slot.contains_key(**pattern))?;
        slot.get_mut(*pattern).map(|handler| &mut **handler)
    }

    pub fn contains(&self, kind: NodeKind, pattern: &str) -> bool {
        self.callbacks
            .get(&kind)
            .is_some_and(|slot| slot.contains_key(pattern))
    }

    /// Total number of bindings across all kinds
    pub fn len(&self) -> usize {
        self.callbacks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

impl fmt::Debug for Registry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<(NodeKind, &str)> = self
            .callbacks
            .iter()
            .flat_map(|(kind, slot)| slot.keys().map(move |pattern| (*kind, pattern.as_str())))
            .collect();
        keys.sort_by(|a, b| (a.0.as_str(), a.1).cmp(&(b.0.as_str(), b.1)));
        f.debug_struct("Registry").field("callbacks", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::ParseError;
    use crate::reader::{Cursor, NodeEvent};
    use crate::track::PositionTracker;

    struct Disabled;

    /// A cursor with nothing to read
    struct Idle;

    impl Cursor for Idle {
        fn advance(&mut self) -> std::result::Result<Option<NodeEvent>, ParseError> {
            Ok(None)
        }
    }

    impl Handler for Disabled {
        fn handle(&mut self, _node: &NodeView<'_>) -> Control {
            Control::Continue
        }

        fn is_callable(&self) -> bool {
            false
        }
    }

    fn noop(_: &NodeView<'_>) -> Control {
        Control::Continue
    }

    #[test]
    fn test_register_and_contains() {
        let mut registry = Registry::new();
        registry.register("/a/b", NodeKind::Element, noop).unwrap();
        registry.register("/a/b", NodeKind::Text, noop).unwrap();
        assert!(registry.contains(NodeKind::Element, "/a/b"));
        assert!(!registry.contains(NodeKind::Comment, "/a/b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_conflict_keeps_first() {
        let mut registry = Registry::new();
        registry.register("/a/b", NodeKind::Element, |_: &NodeView<'_>| Control::Stop).unwrap();
        let err = registry.register("/a/b", NodeKind::Element, noop).unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict { ref pattern, kind: NodeKind::Element } if pattern == "/a/b"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_not_callable() {
        let mut registry = Registry::new();
        let err = registry.register_handler("b", NodeKind::Element, Disabled).unwrap_err();
        assert!(matches!(err, Error::NotCallable { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut registry = Registry::new();
        registry.register("b", NodeKind::Element, noop).unwrap();
        registry.unregister("b", NodeKind::Element).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.unregister("b", NodeKind::Element),
            Err(Error::UnknownCallback { .. })
        ));
        assert!(matches!(
            registry.unregister("zzz", NodeKind::Text),
            Err(Error::UnknownCallback { .. })
        ));
    }

    #[test]
    fn test_lookup_order() {
        let mut registry = Registry::new();
        registry.register("/a/b", NodeKind::Element, |_: &NodeView<'_>| Control::Stop).unwrap();
        registry.register("/a/b[2]", NodeKind::Element, noop).unwrap();

        fn first(registry: &mut Registry<'_>, candidates: &[&str]) -> Control {
            let handler = registry.lookup(NodeKind::Element, candidates).unwrap();
            let event = NodeEvent::element(1, "b");
            let tracker = PositionTracker::new();
            handler.handle(&NodeView::new(&event, &tracker, &Idle))
        }
        assert_eq!(first(&mut registry, &["b", "/a/b", "/a/b[2]"]), Control::Stop);
        assert_eq!(first(&mut registry, &["/a/b[2]", "/a/b"]), Control::Continue);

        assert!(registry.lookup(NodeKind::Element, &["b", "/a/c"]).is_none());
        assert!(registry.lookup(NodeKind::Text, &["/a/b"]).is_none());
    }

    #[test]
    fn test_clear() {
        let mut registry = Registry::new();
        registry.register("b", NodeKind::Element, noop).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(format!("{registry:?}"), "Registry { callbacks: [] }");
    }
}
