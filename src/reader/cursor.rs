//! Zero-Copy XML Cursor
//!
//! Pulls tokens from a byte slice and reports them as depth-annotated node
//! events. Only the open-element stack and the current node are kept; the
//! input is never buffered.

use super::events::{NodeAttribute, NodeEvent, NodeKind, Subtree, SubtreeEvent};
use super::Cursor;
use crate::core::attributes::{parse_attributes, parse_attributes_strict};
use crate::core::scanner::is_whitespace;
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};
use std::collections::VecDeque;

/// Cursor behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorOptions {
    /// Reject malformed input instead of recovering
    pub strict: bool,
    /// Report each attribute as its own node right after its element
    pub report_attributes: bool,
    /// Keep whitespace-only text when expanding subtrees
    pub preserve_whitespace: bool,
}

impl Default for CursorOptions {
    fn default() -> Self {
        CursorOptions {
            strict: false,
            report_attributes: false,
            preserve_whitespace: true,
        }
    }
}

impl CursorOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn report_attributes(mut self, report: bool) -> Self {
        self.report_attributes = report;
        self
    }

    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }
}

/// The node the cursor is positioned on
#[derive(Debug, Clone)]
struct Current<'a> {
    event: NodeEvent,
    name: &'a [u8],
    value: Option<String>,
    attributes: Vec<NodeAttribute>,
    /// Token stream right after a non-empty start tag
    content: Option<Tokenizer<'a>>,
}

/// Forward-only cursor over an in-memory document
pub struct XmlCursor<'a> {
    tokenizer: Tokenizer<'a>,
    options: CursorOptions,
    open: Vec<&'a [u8]>,
    pending: VecDeque<(usize, NodeAttribute)>,
    current: Option<Current<'a>>,
}

impl<'a> XmlCursor<'a> {
    /// Create a lenient cursor
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_options(input, CursorOptions::default())
    }

    /// Create a cursor that fails on malformed input
    pub fn new_strict(input: &'a [u8]) -> Self {
        Self::with_options(input, CursorOptions::default().strict(true))
    }

    pub fn with_options(input: &'a [u8], options: CursorOptions) -> Self {
        let tokenizer = if options.strict {
            Tokenizer::new_strict(input)
        } else {
            Tokenizer::new(input)
        };
        XmlCursor {
            tokenizer,
            options,
            open: Vec::new(),
            pending: VecDeque::new(),
            current: None,
        }
    }

    pub fn options(&self) -> CursorOptions {
        self.options
    }

    /// Number of currently open elements
    pub fn open_elements(&self) -> usize {
        self.open.len()
    }

    fn emit(&mut self, current: Current<'a>) -> Option<NodeEvent> {
        let event = current.event.clone();
        self.current = Some(current);
        Some(event)
    }

    fn character_data(&mut self, kind: NodeKind, value: String, name: &'a [u8]) -> Option<NodeEvent> {
        let event = NodeEvent::new(self.open.len(), kind, String::from_utf8_lossy(name));
        self.emit(Current {
            event,
            name,
            value: Some(value),
            attributes: Vec::new(),
            content: None,
        })
    }

    fn start_element(&mut self, token: &Token<'a>) -> Result<Option<NodeEvent>, ParseError> {
        let name = token.name.unwrap_or_default();
        let attributes = owned_attributes(token, self.options.strict)?;
        let depth = self.open.len();

        if self.options.report_attributes {
            self.pending
                .extend(attributes.iter().cloned().map(|attr| (depth + 1, attr)));
        }

        let content = if token.kind == TokenKind::StartTag {
            self.open.push(name);
            Some(self.tokenizer.clone())
        } else {
            None
        };

        Ok(self.emit(Current {
            event: NodeEvent::element(depth, token.name_lossy()),
            name,
            value: None,
            attributes,
            content,
        }))
    }

    fn end_element(&mut self, token: &Token<'a>) -> Result<Option<NodeEvent>, ParseError> {
        let name = token.name.unwrap_or_default();
        let Some(depth) = close_to(&self.open, name, self.options.strict, token.span.0)? else {
            return Ok(None);
        };
        self.open.truncate(depth);
        Ok(self.emit(Current {
            event: NodeEvent::new(depth, NodeKind::EndElement, token.name_lossy()),
            name,
            value: None,
            attributes: Vec::new(),
            content: None,
        }))
    }

    /// Collect the current element and its descendants from a forked stream
    fn collect_element(&self, current: &Current<'a>, mut stream: Tokenizer<'a>) -> Result<Vec<SubtreeEvent>, ParseError> {
        let mut events = vec![SubtreeEvent::Open {
            name: current.event.name.clone(),
            attributes: current.attributes.clone(),
        }];
        let mut open = vec![current.name];

        while !open.is_empty() {
            let Some(token) = stream.next_token() else {
                if let Some(err) = stream.error() {
                    return Err(err.clone());
                }
                break;
            };

            match token.kind {
                TokenKind::StartTag | TokenKind::EmptyTag => {
                    events.push(SubtreeEvent::Open {
                        name: token.name_lossy().into_owned(),
                        attributes: owned_attributes(&token, self.options.strict)?,
                    });
                    if token.kind == TokenKind::StartTag {
                        open.push(token.name.unwrap_or_default());
                    } else {
                        events.push(SubtreeEvent::Close);
                    }
                }
                TokenKind::EndTag => {
                    let name = token.name.unwrap_or_default();
                    if let Some(depth) = close_to(&open, name, self.options.strict, token.span.0)? {
                        events.extend((depth..open.len()).map(|_| SubtreeEvent::Close));
                        open.truncate(depth);
                    }
                }
                TokenKind::Text => {
                    let text = content_lossy(&token);
                    if self.options.preserve_whitespace || !text.bytes().all(is_whitespace) {
                        events.push(SubtreeEvent::Text(text));
                    }
                }
                TokenKind::CData => events.push(SubtreeEvent::CData(content_lossy(&token))),
                TokenKind::Comment => events.push(SubtreeEvent::Comment(content_lossy(&token))),
                TokenKind::ProcessingInstruction => events.push(SubtreeEvent::Instruction {
                    target: token.name_lossy().into_owned(),
                    data: content_lossy(&token),
                }),
                TokenKind::Eof => {
                    if self.options.strict {
                        return Err(unclosed(&open, token.span.0));
                    }
                    break;
                }
                TokenKind::XmlDeclaration | TokenKind::DocType => {}
            }
        }

        // Lenient recovery closes whatever the input left open
        events.extend(open.iter().map(|_| SubtreeEvent::Close));
        Ok(events)
    }
}

impl Cursor for XmlCursor<'_> {
    fn advance(&mut self) -> Result<Option<NodeEvent>, ParseError> {
        if let Some((depth, attr)) = self.pending.pop_front() {
            let event = NodeEvent::new(depth, NodeKind::Attribute, attr.name.as_str());
            return Ok(self.emit(Current {
                event,
                name: b"",
                value: Some(attr.value),
                attributes: Vec::new(),
                content: None,
            }));
        }

        loop {
            let Some(token) = self.tokenizer.next_token() else {
                self.current = None;
                return match self.tokenizer.error() {
                    Some(err) => Err(err.clone()),
                    None => Ok(None),
                };
            };

            match token.kind {
                TokenKind::Eof => {
                    self.current = None;
                    if self.options.strict && !self.open.is_empty() {
                        return Err(unclosed(&self.open, token.span.0));
                    }
                    return Ok(None);
                }
                TokenKind::StartTag | TokenKind::EmptyTag => return self.start_element(&token),
                TokenKind::EndTag => {
                    if let Some(event) = self.end_element(&token)? {
                        return Ok(Some(event));
                    }
                }
                TokenKind::Text => {
                    let text = content_lossy(&token);
                    let kind = if text.bytes().all(is_whitespace) {
                        NodeKind::Whitespace
                    } else if self.options.strict && self.open.is_empty() {
                        return Err(ParseError::new(
                            "Text content is not allowed outside the root element",
                            token.span.0,
                        ));
                    } else {
                        NodeKind::Text
                    };
                    return Ok(self.character_data(kind, text, b""));
                }
                TokenKind::CData => {
                    let text = content_lossy(&token);
                    return Ok(self.character_data(NodeKind::CData, text, b""));
                }
                TokenKind::Comment => {
                    let text = content_lossy(&token);
                    return Ok(self.character_data(NodeKind::Comment, text, b""));
                }
                TokenKind::ProcessingInstruction => {
                    let data = content_lossy(&token);
                    let target = token.name.unwrap_or_default();
                    return Ok(self.character_data(NodeKind::ProcessingInstruction, data, target));
                }
                TokenKind::XmlDeclaration | TokenKind::DocType => {}
            }
        }
    }

    fn attributes(&self) -> &[NodeAttribute] {
        self.current.as_ref().map(|c| c.attributes.as_slice()).unwrap_or_default()
    }

    fn value(&self) -> Option<&str> {
        self.current.as_ref()?.value.as_deref()
    }

    fn expand(&self) -> Result<Option<Subtree>, ParseError> {
        let Some(current) = &self.current else {
            return Ok(None);
        };
        let value = || current.value.clone().unwrap_or_default();

        let events = match current.event.kind {
            NodeKind::Element => match &current.content {
                Some(stream) => self.collect_element(current, stream.clone())?,
                None => vec![
                    SubtreeEvent::Open {
                        name: current.event.name.clone(),
                        attributes: current.attributes.clone(),
                    },
                    SubtreeEvent::Close,
                ],
            },
            NodeKind::Text | NodeKind::Whitespace | NodeKind::Attribute => vec![SubtreeEvent::Text(value())],
            NodeKind::CData => vec![SubtreeEvent::CData(value())],
            NodeKind::Comment => vec![SubtreeEvent::Comment(value())],
            NodeKind::ProcessingInstruction => vec![SubtreeEvent::Instruction {
                target: current.event.name.clone(),
                data: value(),
            }],
            NodeKind::EndElement => return Ok(None),
        };
        Ok(Some(Subtree::new(events)))
    }
}

/// Resolve an end tag against the open-element stack
///
/// Returns the depth of the element being closed. In lenient mode a
/// mismatched end tag closes up to the nearest matching element, and a stray
/// one is ignored (`None`).
fn close_to(open: &[&[u8]], name: &[u8], strict: bool, at: usize) -> Result<Option<usize>, ParseError> {
    match open.iter().rposition(|&n| n == name) {
        Some(depth) if strict && depth + 1 != open.len() => Err(ParseError::new(
            format!(
                "Tag mismatch: <{}> closed by </{}>",
                String::from_utf8_lossy(open[open.len() - 1]),
                String::from_utf8_lossy(name)
            ),
            at,
        )),
        Some(depth) => Ok(Some(depth)),
        None if strict => Err(ParseError::new(
            format!("Unexpected end tag </{}>", String::from_utf8_lossy(name)),
            at,
        )),
        None => Ok(None),
    }
}

fn unclosed(open: &[&[u8]], at: usize) -> ParseError {
    let innermost = open.last().copied().unwrap_or_default();
    ParseError::new(format!("Unclosed tag: <{}>", String::from_utf8_lossy(innermost)), at)
}

fn content_lossy(token: &Token<'_>) -> String {
    token
        .content
        .as_deref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn owned_attributes(token: &Token<'_>, strict: bool) -> Result<Vec<NodeAttribute>, ParseError> {
    let attrs = if strict {
        parse_attributes_strict(token.attrs).map_err(|msg| ParseError::new(msg, token.span.0))?
    } else {
        parse_attributes(token.attrs)
    };
    Ok(attrs
        .into_iter()
        .map(|attr| {
            NodeAttribute::new(
                String::from_utf8_lossy(attr.name),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )
        })
        .collect())
}
