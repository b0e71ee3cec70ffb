//! DOM Module - Arena-based fragments of expanded nodes
//!
//! Implements a small DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and content
//! - Path queries in the same language the tracker renders

pub mod document;
pub mod node;
pub mod select;
pub mod strings;

pub use document::{Fragment, DEFAULT_CONTAINER};
pub use node::{NodeId, NodeType, XmlAttribute, XmlNode};
pub use select::{PathQuery, Selection};
pub use strings::StringPool;
