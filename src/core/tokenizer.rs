//! XML Tokenizer - State machine for XML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts XML tokens:
//! - Element start/end tags
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions
//!
//! In lenient mode malformed markup simply ends the token stream. In strict
//! mode the first problem is recorded as a [`ParseError`].

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Initial state before parsing starts
    Init,
    /// Between markup constructs
    InsideText,
    /// End of input reached
    Done,
}

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// For tags and PIs: the element name or PI target
    pub name: Option<&'a [u8]>,
    /// For text, CDATA, comments and PI data: the content (entity-decoded for text)
    pub content: Option<Cow<'a, [u8]>>,
    /// For start/empty tags: raw attribute bytes between the name and '>' or '/>'
    pub attrs: &'a [u8],
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            attrs: &[],
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }

    /// Name as UTF-8, lossy for invalid sequences
    pub fn name_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.name.unwrap_or_default())
    }
}

/// Malformed input detected by the tokenizer or the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the input
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// XML tokenizer implementing a pull-parser pattern
///
/// Cheap to clone: cloning forks the token stream at the current position.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
    strict: bool,
    error: Option<ParseError>,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input (lenient mode)
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Init,
            strict: false,
            error: None,
        }
    }

    /// Create a new tokenizer in strict mode
    pub fn new_strict(input: &'a [u8]) -> Self {
        Tokenizer {
            strict: true,
            ..Tokenizer::new(input)
        }
    }

    /// Get any parse error (strict mode only)
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Record an error if in strict mode; returns None so callers can bail out
    fn fail<T>(&mut self, message: &str) -> Option<T> {
        if self.strict && self.error.is_none() {
            self.error = Some(ParseError::new(message, self.scanner.position()));
        }
        self.state = ParseState::Done;
        None
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next token, or None if the stream ended abnormally
    ///
    /// A well-formed stream ends with exactly one `Eof` token.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if self.state == ParseState::Done {
            return None;
        }

        if self.state == ParseState::Init {
            let start = self.scanner.position();
            self.scanner.skip_whitespace();
            if self.strict && self.scanner.position() > start && self.scanner.starts_with(b"<?xml") {
                return self.fail("XML declaration must be at the very start of the document");
            }
            self.state = ParseState::InsideText;
        }

        match self.scanner.peek() {
            None => {
                self.state = ParseState::Done;
                let at = self.scanner.position();
                Some(Token::new(TokenKind::Eof, (at, at)))
            }
            Some(b'<') => self.parse_markup(),
            Some(_) => self.parse_text(),
        }
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Option<Token<'a>> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => self.fail("Unexpected end of input after '<'"),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Option<Token<'a>> {
        let Some(name) = self.scanner.read_name() else {
            return self.fail("Invalid element name: must start with letter, underscore, or colon");
        };
        let attr_start = self.scanner.position();

        let Some(end) = self.scanner.find_tag_end_quoted() else {
            return self.fail("Unterminated start tag");
        };

        let is_empty = end > attr_start && self.scanner.slice(end - 1, end) == b"/";
        let attr_end = if is_empty { end - 1 } else { end };

        if self.strict {
            let attrs = self.scanner.slice(attr_start, attr_end);
            if attrs.first().is_some_and(|&b| !is_whitespace(b)) {
                return self.fail("Invalid character in element name");
            }
        }

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        let mut token = Token::new(kind, (start, end + 1)).with_name(name);
        token.attrs = self.scanner.slice(attr_start, attr_end);
        Some(token)
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '/'

        let Some(name) = self.scanner.read_name() else {
            return self.fail("Invalid element name in end tag");
        };

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            if self.strict {
                return self.fail("End tag cannot have attributes or other content");
            }
            let Some(end) = self.scanner.find_byte(b'>') else {
                return self.fail("Unterminated end tag");
            };
            self.scanner.set_position(end);
        }
        self.scanner.advance(1); // Skip '>'

        Some(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            self.fail("Invalid declaration - expected comment, CDATA, or DOCTYPE")
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let Some(end) = self.scanner.find_sequence(b"-->") else {
            return self.fail("Unterminated comment");
        };
        let content = self.scanner.slice(content_start, end);

        if self.strict && (content.windows(2).any(|w| w == b"--") || content.last() == Some(&b'-')) {
            return self.fail("Comment cannot contain '--'");
        }

        self.scanner.set_position(end + 3);
        Some(Token::new(TokenKind::Comment, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();

        let Some(end) = self.scanner.find_sequence(b"]]>") else {
            return self.fail("Unterminated CDATA section");
        };
        let content = self.scanner.slice(content_start, end);

        self.scanner.set_position(end + 3);
        Some(Token::new(TokenKind::CData, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Skip a DOCTYPE declaration, including any internal subset
    fn parse_doctype(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(7); // Skip 'DOCTYPE'

        let mut in_subset = false;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.scanner.peek() {
            self.scanner.advance(1);
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => in_subset = true,
                (None, b']') => in_subset = false,
                (None, b'>') if !in_subset => {
                    return Some(Token::new(TokenKind::DocType, (start, self.scanner.position())));
                }
                _ => {}
            }
        }
        self.fail("Unterminated DOCTYPE declaration")
    }

    /// Parse a processing instruction <?...?>
    fn parse_pi(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '?'

        let Some(name) = self.scanner.read_name() else {
            return self.fail("Invalid processing instruction target");
        };
        let is_xml_decl = name == b"xml";
        if self.strict && !is_xml_decl && name.eq_ignore_ascii_case(b"xml") {
            return self.fail("Processing instruction target cannot be 'xml'");
        }

        let Some(end) = self.scanner.find_sequence(b"?>") else {
            return self.fail("Unterminated processing instruction");
        };
        let data = self.scanner.slice(self.scanner.position(), end);
        let data = match data.iter().position(|&b| !is_whitespace(b)) {
            Some(first) => &data[first..],
            None => &[],
        };

        self.scanner.set_position(end + 2);
        let kind = if is_xml_decl { TokenKind::XmlDeclaration } else { TokenKind::ProcessingInstruction };
        Some(Token::new(kind, (start, end + 2)).with_name(name).with_content(Cow::Borrowed(data)))
    }

    /// Parse text content up to the next '<'
    fn parse_text(&mut self) -> Option<Token<'a>> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(start + self.scanner.remaining().len());
        let content = self.scanner.slice(start, end);

        let decoded = if self.strict {
            if content.windows(3).any(|w| w == b"]]>") {
                return self.fail("Text content cannot contain ']]>'");
            }
            match decode_text_strict(content) {
                Ok(v) => v,
                Err(msg) => return self.fail(msg),
            }
        } else {
            decode_text(content)
        };

        self.scanner.set_position(end);
        Some(Token::new(TokenKind::Text, (start, end)).with_content(decoded))
    }
}

/// Iterator adapter for tokenizer
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().filter(|token| token.kind != TokenKind::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &[u8]) -> Vec<TokenKind> {
        Tokenizer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_element() {
        let mut tok = Tokenizer::new(b"<root>content</root>");

        let t1 = tok.next_token().unwrap();
        assert_eq!(t1.kind, TokenKind::StartTag);
        assert_eq!(t1.name, Some(b"root" as &[u8]));

        let t2 = tok.next_token().unwrap();
        assert_eq!(t2.kind, TokenKind::Text);
        assert_eq!(t2.content.as_deref(), Some(b"content" as &[u8]));

        let t3 = tok.next_token().unwrap();
        assert_eq!(t3.kind, TokenKind::EndTag);
        assert_eq!(t3.name, Some(b"root" as &[u8]));

        assert_eq!(tok.next_token().unwrap().kind, TokenKind::Eof);
        assert!(tok.next_token().is_none());
    }

    #[test]
    fn test_empty_element_with_attributes() {
        let mut tok = Tokenizer::new(b"<br id=\"x\"/>");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.name, Some(b"br" as &[u8]));
        assert_eq!(t.attrs, b" id=\"x\"");
    }

    #[test]
    fn test_cdata_and_comment() {
        let mut tok = Tokenizer::new(b"<![CDATA[<script>]]><!-- note -->");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::CData);
        assert_eq!(t.content.as_deref(), Some(b"<script>" as &[u8]));
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Comment);
        assert_eq!(t.content.as_deref(), Some(b" note " as &[u8]));
    }

    #[test]
    fn test_prolog() {
        let input = b"<?xml version=\"1.0\"?>\n<!DOCTYPE a [<!ENTITY x \">\">]>\n<?pi some data?><a/>";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::XmlDeclaration,
                TokenKind::Text,
                TokenKind::DocType,
                TokenKind::Text,
                TokenKind::ProcessingInstruction,
                TokenKind::EmptyTag,
            ]
        );
    }

    #[test]
    fn test_pi_data() {
        let mut tok = Tokenizer::new(b"<?render  fast?>");
        let t = tok.next_token().unwrap();
        assert_eq!(t.name, Some(b"render" as &[u8]));
        assert_eq!(t.content.as_deref(), Some(b"fast" as &[u8]));
    }

    #[test]
    fn test_fork_keeps_position() {
        let mut tok = Tokenizer::new(b"<a><b/></a>");
        tok.next_token();
        let mut fork = tok.clone();
        assert_eq!(fork.next_token().unwrap().kind, TokenKind::EmptyTag);
        assert_eq!(fork.next_token().unwrap().kind, TokenKind::EndTag);
        assert_eq!(tok.next_token().unwrap().kind, TokenKind::EmptyTag);
    }

    #[test]
    fn test_lenient_stops_without_error() {
        let mut tok = Tokenizer::new(b"<a><!-- open");
        tok.next_token();
        assert!(tok.next_token().is_none());
        assert!(tok.error().is_none());
    }

    #[test]
    fn test_strict_errors() {
        for input in [
            &b"<a><!-- open"[..],
            b"<a><1/></a>",
            b"<a></a x=\"1\">",
            b"<a><!-- a--b --></a>",
            b"<a>]]></a>",
            b"<a>&#0;</a>",
            b"<!FOO>",
        ] {
            let mut tok = Tokenizer::new_strict(input);
            while tok.next_token().is_some() {}
            assert!(tok.error().is_some(), "expected error for {:?}", String::from_utf8_lossy(input));
        }
    }
}
