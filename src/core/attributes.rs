//! XML Attribute Parsing
//!
//! Parses XML attributes from the tag content that follows the element name.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }
}

/// Parse attributes from raw tag content (lenient)
///
/// Valueless and unquoted attributes are accepted, junk bytes are skipped.
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    match parse(input, false) {
        Ok(attrs) => attrs,
        Err((attrs, _)) => attrs,
    }
}

/// Parse attributes, rejecting anything that is not well-formed
pub fn parse_attributes_strict(input: &[u8]) -> Result<Vec<Attribute<'_>>, &'static str> {
    let attrs = parse(input, true).map_err(|(_, msg)| msg)?;
    for (i, attr) in attrs.iter().enumerate() {
        if attrs[i + 1..].iter().any(|other| other.name == attr.name) {
            return Err("Duplicate attribute");
        }
    }
    Ok(attrs)
}

type Partial<'a> = (Vec<Attribute<'a>>, &'static str);

fn parse(input: &[u8], strict: bool) -> Result<Vec<Attribute<'_>>, Partial<'_>> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        let start_ws = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }
        if strict && pos == start_ws && !attrs.is_empty() {
            return Err((attrs, "Whitespace required between attributes"));
        }

        if !is_name_start_char(input[pos]) {
            if strict {
                return Err((attrs, "Attribute name must start with letter, underscore, or colon"));
            }
            pos += 1;
            continue;
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() || input[pos] != b'=' {
            if strict {
                return Err((attrs, "Attribute value required"));
            }
            attrs.push(Attribute { name, value: Cow::Borrowed(b"") });
            continue;
        }
        pos += 1; // Skip '='

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        let quote = match input.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            Some(_) if !strict => {
                // Unquoted value (non-standard but handle it)
                let value_start = pos;
                while pos < input.len() && !is_whitespace(input[pos]) {
                    pos += 1;
                }
                let value = decode_text(&input[value_start..pos]);
                attrs.push(Attribute { name, value });
                continue;
            }
            Some(_) => return Err((attrs, "Attribute value must be quoted")),
            None if strict => return Err((attrs, "Attribute value required")),
            None => break,
        };

        pos += 1; // Skip opening quote
        let value_start = pos;
        let value_end = match memchr(quote, &input[pos..]) {
            Some(offset) => pos + offset,
            None if strict => return Err((attrs, "Attribute value has mismatched quotes")),
            None => input.len(),
        };
        let raw = &input[value_start..value_end];
        pos = (value_end + 1).min(input.len());

        let value = if strict {
            if memchr(b'<', raw).is_some() {
                return Err((attrs, "Attribute value cannot contain '<'"));
            }
            match decode_text_strict(raw) {
                Ok(v) => v,
                Err(msg) => return Err((attrs, msg)),
            }
        } else {
            decode_text(raw)
        };
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}
