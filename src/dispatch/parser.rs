//! Parser facade
//!
//! Owns the callback registry across sequential parse runs and opens a
//! fresh session for each cursor.

use super::handler::{Control, Handler};
use super::registry::Registry;
use super::session::{NodeView, ParseOutcome, Session};
use crate::error::Result;
use crate::reader::{Cursor, CursorOptions, NodeKind, XmlCursor};

/// Path-routed XML parser
///
/// ```
/// use rustyxml_router::{Control, NodeKind, XmlParser};
///
/// let mut titles = Vec::new();
/// let mut parser = XmlParser::new();
/// parser
///     .register("/shelf/book/title/text()", NodeKind::Text, |node| {
///         titles.push(node.value().unwrap_or_default().to_string());
///         Control::Continue
///     })
///     .unwrap();
/// parser.parse_bytes(b"<shelf><book><title>Dune</title></book></shelf>").unwrap();
/// drop(parser);
/// assert_eq!(titles, vec!["Dune"]);
/// ```
#[derive(Debug, Default)]
pub struct XmlParser<'h> {
    registry: Registry<'h>,
}

impl<'h> XmlParser<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a closure to `(kind, pattern)`
    pub fn register<F>(&mut self, pattern: impl Into<String>, kind: NodeKind, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&NodeView<'_>) -> Control + 'h,
    {
        self.registry.register(pattern, kind, handler)?;
        Ok(self)
    }

    /// Bind any [`Handler`] to `(kind, pattern)`
    pub fn register_handler<H>(&mut self, pattern: impl Into<String>, kind: NodeKind, handler: H) -> Result<&mut Self>
    where
        H: Handler + 'h,
    {
        self.registry.register_handler(pattern, kind, handler)?;
        Ok(self)
    }

    pub fn unregister(&mut self, pattern: &str, kind: NodeKind) -> Result<&mut Self> {
        self.registry.unregister(pattern, kind)?;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry<'h> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<'h> {
        &mut self.registry
    }

    /// Open a session over `cursor` without starting it
    pub fn session<'s, C: Cursor>(&'s mut self, cursor: &'s mut C) -> Session<'s, 'h, C> {
        Session::new(&mut self.registry, cursor)
    }

    /// Run a fresh session over `cursor` until a handler stops it or the
    /// cursor runs out
    pub fn parse<C: Cursor>(&mut self, cursor: &mut C) -> Result<ParseOutcome> {
        self.session(cursor).parse()
    }

    /// Parse an in-memory document with the lenient bundled cursor
    pub fn parse_bytes(&mut self, input: &[u8]) -> Result<ParseOutcome> {
        self.parse_bytes_with(input, CursorOptions::default())
    }

    pub fn parse_bytes_with(&mut self, input: &[u8], options: CursorOptions) -> Result<ParseOutcome> {
        let mut cursor = XmlCursor::with_options(input, options);
        self.parse(&mut cursor)
    }
}
