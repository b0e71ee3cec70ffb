//! Dispatch Module
//!
//! Routes tracked nodes to handlers:
//! - Handler / Control: what runs and what it asks for next
//! - Registry: (kind, pattern) bindings
//! - Session: the dispatch loop over one cursor
//! - XmlParser: registry owner and session factory

pub mod handler;
pub mod parser;
pub mod registry;
pub mod session;

pub use handler::{Control, Handler};
pub use parser::XmlParser;
pub use registry::Registry;
pub use session::{NodeView, ParseOutcome, Session, SessionState};
