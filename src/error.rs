//! Error types
//!
//! All errors are raised synchronously to the immediate caller and are never
//! retried internally.

use crate::core::tokenizer::ParseError;
use crate::reader::NodeKind;

/// Errors raised by the registry, the tracker and the dispatch loop
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A handler is already bound to this (kind, pattern) key
    #[error("callback already registered for '{pattern}' ({kind})")]
    RegistrationConflict { pattern: String, kind: NodeKind },

    /// The handler reported that it cannot be invoked
    #[error("callback for '{pattern}' ({kind}) is not callable")]
    NotCallable { pattern: String, kind: NodeKind },

    /// No handler is bound to this (kind, pattern) key
    #[error("unknown callback '{pattern}' ({kind})")]
    UnknownCallback { pattern: String, kind: NodeKind },

    /// `parse` was called with no handlers registered
    #[error("no callbacks registered")]
    EmptyRegistry,

    /// Per-depth tracking components disagree in length
    #[error("empty reader: {frames} frames but {tallies} sibling tallies")]
    EmptyReader { frames: usize, tallies: usize },

    /// The cursor produced a depth the tracker never recorded a frame for
    #[error("structural integrity violated at depth {depth}: {recorded} levels recorded")]
    StructuralIntegrity { depth: usize, recorded: usize },

    /// The session already failed and its tracking state is not trustworthy
    #[error("session has failed and cannot be used")]
    SessionFailed,

    /// Malformed input reported by the cursor
    #[error("malformed XML at byte {}: {}", .0.position, .0.message)]
    Cursor(#[from] ParseError),

    /// Malformed path expression given to a fragment query
    #[error("invalid path query '{path}': {reason}")]
    Query { path: String, reason: &'static str },
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors that leave the session's tracking state untrustworthy
    pub fn poisons_session(&self) -> bool {
        matches!(
            self,
            Error::EmptyReader { .. } | Error::StructuralIntegrity { .. } | Error::Cursor(_)
        )
    }
}
