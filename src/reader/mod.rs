//! Cursor Module
//!
//! The forward-only cursor the dispatch loop pulls from:
//! - Cursor: the trait any token source implements
//! - Events: node snapshots and expanded subtrees
//! - XmlCursor: the bundled zero-copy cursor over a byte slice

pub mod cursor;
pub mod events;

pub use cursor::{CursorOptions, XmlCursor};
pub use events::{NodeAttribute, NodeEvent, NodeKind, Subtree, SubtreeEvent};

use crate::core::tokenizer::ParseError;

/// Forward-only reader over an XML token stream
pub trait Cursor {
    /// Move to the next node; `Ok(None)` signals end of stream
    fn advance(&mut self) -> Result<Option<NodeEvent>, ParseError>;

    /// Attributes of the current node (elements only)
    fn attributes(&self) -> &[NodeAttribute] {
        &[]
    }

    /// Character content of the current node (text, CDATA, comment,
    /// attribute value, processing instruction data)
    fn value(&self) -> Option<&str> {
        None
    }

    /// The current node and its descendants, without moving the cursor
    ///
    /// `Ok(None)` when the cursor cannot expand the current position.
    fn expand(&self) -> Result<Option<Subtree>, ParseError> {
        Ok(None)
    }
}
