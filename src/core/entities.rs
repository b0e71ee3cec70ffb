//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present, Owned if entities were decoded.
/// Unknown or malformed references are kept verbatim.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    match decode_entities(input, false) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(input),
    }
}

/// Decode text content in strict mode
///
/// Character references to code points outside the XML 1.0 `Char`
/// production and references without a terminating ';' are errors.
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, true).map(Cow::Owned)
}

fn decode_entities(input: &[u8], strict: bool) -> Result<Vec<u8>, &'static str> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let Some(semi) = memchr(b';', &input[pos..]) else {
            if strict {
                return Err("Entity reference is missing ';'");
            }
            result.push(b'&');
            pos += 1;
            continue;
        };

        let entity = &input[pos + 1..pos + semi];
        match decode_entity(entity) {
            Some(ch) => {
                let mut buf = [0u8; 4];
                result.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                pos += semi + 1;
            }
            None if strict && entity.first() == Some(&b'#') => {
                return Err("Invalid character reference");
            }
            None => {
                // Unknown entity, keep as-is
                result.push(b'&');
                pos += 1;
            }
        }
    }

    result.extend_from_slice(&input[pos..]);
    Ok(result)
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Option<char> {
    match entity {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => {
            let hex = std::str::from_utf8(hex).ok()?;
            u32::from_str_radix(hex, 16).ok().and_then(xml_char)
        }
        [b'#', dec @ ..] => {
            let dec = std::str::from_utf8(dec).ok()?;
            dec.parse::<u32>().ok().and_then(xml_char)
        }
        _ => None,
    }
}

/// Convert a code point to a char if it is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
fn xml_char(codepoint: u32) -> Option<char> {
    match codepoint {
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF => {
            char::from_u32(codepoint)
        }
        _ => None,
    }
}

/// Encode text for XML output (escape markup characters)
pub fn encode_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Encode text for use in double-quoted XML attributes
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let needs_escape = |b: u8| matches!(b, b'<' | b'>' | b'&') || (quotes && b == b'"');
    if !input.bytes().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' if quotes => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text(b"Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), b"Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text(b"&lt;hello&gt; &amp; &quot;world&quot;");
        assert_eq!(result.as_ref(), b"<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text(b"&#65;&#66;&#67;").as_ref(), b"ABC");
        assert_eq!(decode_text(b"&#x41;&#x42;&#x43;").as_ref(), b"ABC");
        assert_eq!(std::str::from_utf8(decode_text(b"&#x1F600;").as_ref()).unwrap(), "😀");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text(b"&unknown;").as_ref(), b"&unknown;");
        assert_eq!(decode_text(b"a & b").as_ref(), b"a & b");
    }

    #[test]
    fn test_strict_rejects_bad_references() {
        assert!(decode_text_strict(b"&#0;").is_err());
        assert!(decode_text_strict(b"a & b").is_err());
        assert_eq!(decode_text_strict(b"&amp;").unwrap().as_ref(), b"&");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_text("<a> & \"b\""), "&lt;a&gt; &amp; \"b\"");
        assert_eq!(encode_attribute("say \"hi\""), "say &quot;hi&quot;");
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }
}
