//! RustyXML Router - Path-routed handler dispatch over a forward-only XML cursor
//!
//! Layers:
//! core:     memchr tokenizer, entity decoding, attribute parsing
//! reader:   the `Cursor` trait and the bundled zero-copy `XmlCursor`
//! track:    depth frames, sibling ordinals and path rendering
//! dispatch: callback registry, dispatch loop and the `XmlParser` facade
//! dom:      arena fragments for expanded nodes, with path queries
//!
//! Nothing is buffered beyond the current ancestor chain; a fragment is only
//! built when a handler asks for one.

pub mod core;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod reader;
pub mod track;

pub use crate::core::tokenizer::ParseError;
pub use dispatch::{Control, Handler, NodeView, ParseOutcome, Registry, Session, SessionState, XmlParser};
pub use dom::{Fragment, NodeId, NodeType, Selection};
pub use error::{Error, Result};
pub use reader::{Cursor, CursorOptions, NodeAttribute, NodeEvent, NodeKind, Subtree, SubtreeEvent, XmlCursor};
pub use track::{DepthFrame, PositionTracker};
