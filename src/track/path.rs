//! Path Rendering
//!
//! Turns a frame stack into an absolute, XPath-like address:
//! `/a/b[2]/text()`, `/a[@id]`, `/a/comment()`.

use super::frame::DepthFrame;
use crate::error::{Error, Result};
use crate::reader::NodeKind;
use std::fmt::Write;

/// Render `frames` as a path
///
/// `tallies` is the number of per-depth sibling tallies kept alongside the
/// frames; a disagreement means the tracking state is unusable. Element
/// segments carry `[n]` when `with_sibling_index` is set, except for the
/// first document element, whose ordinal is always 1.
pub fn build_path(frames: &[DepthFrame], tallies: usize, with_sibling_index: bool) -> Result<String> {
    if frames.len() != tallies {
        return Err(Error::EmptyReader {
            frames: frames.len(),
            tallies,
        });
    }

    let mut path = String::with_capacity(frames.len() * 8);
    for (depth, frame) in frames.iter().enumerate() {
        match frame.kind {
            NodeKind::Element => {
                path.push('/');
                path.push_str(&frame.local_name);
                if with_sibling_index && (depth > 0 || frame.sibling_index > 1) {
                    // Writing to a String cannot fail
                    let _ = write!(path, "[{}]", frame.sibling_index);
                }
            }
            NodeKind::Text | NodeKind::CData => path.push_str("/text()"),
            NodeKind::Comment => path.push_str("/comment()"),
            NodeKind::Attribute => {
                path.push_str("[@");
                path.push_str(&frame.local_name);
                path.push(']');
            }
            NodeKind::ProcessingInstruction | NodeKind::Whitespace | NodeKind::EndElement => {}
        }
    }
    Ok(path)
}
