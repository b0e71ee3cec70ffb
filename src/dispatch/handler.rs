//! Handlers and their control signal

use super::session::NodeView;

/// What a handler wants the dispatch loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    #[default]
    Continue,
    /// End the parse run after this node
    Stop,
}

impl Control {
    #[inline]
    pub fn is_stop(self) -> bool {
        self == Control::Stop
    }
}

/// `true` keeps going, `false` stops
impl From<bool> for Control {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Control::Continue
        } else {
            Control::Stop
        }
    }
}

/// Behaviour bound to a (kind, pattern) key
///
/// Any `FnMut(&NodeView<'_>) -> Control` closure is a handler.
pub trait Handler {
    fn handle(&mut self, node: &NodeView<'_>) -> Control;

    /// Whether the handler can be invoked at all
    ///
    /// Registration rejects handlers that answer `false`.
    fn is_callable(&self) -> bool {
        true
    }
}

impl<F> Handler for F
where
    F: FnMut(&NodeView<'_>) -> Control,
{
    fn handle(&mut self, node: &NodeView<'_>) -> Control {
        self(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_from_bool() {
        assert_eq!(Control::from(true), Control::Continue);
        assert_eq!(Control::from(false), Control::Stop);
        assert!(Control::Stop.is_stop());
        assert_eq!(Control::default(), Control::Continue);
    }
}
