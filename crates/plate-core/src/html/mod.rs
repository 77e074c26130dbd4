//! The persistence boundary: the document as an HTML string and back.

mod parse;
mod serialize;

pub use parse::parse;
pub use serialize::{serialize, wrap_direction};

pub(crate) use serialize::escape_attr;

use crate::config::Theme;
use crate::document::{Document, Node};

/// Markers editors emit for "no content".
const EMPTY_MARKERS: &[&str] = &["<p><br></p>", "<p></p>", "<br>", "<br/>", "<br />"];

pub struct HtmlBridge<'a> {
    theme: &'a Theme,
}

impl<'a> HtmlBridge<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }

    pub fn serialize(&self, doc: &Document) -> String {
        serialize(doc, self.theme)
    }

    /// Never fails. Empty markers give the empty document; malformed or
    /// unusable markup goes through [`fallback`].
    pub fn deserialize(&self, html: &str) -> Document {
        deserialize(html)
    }
}

pub fn is_empty_marker(html: &str) -> bool {
    let trimmed = html.trim();
    trimmed.is_empty()
        || EMPTY_MARKERS
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(trimmed))
}

pub fn deserialize(html: &str) -> Document {
    if is_empty_marker(html) {
        return Document::new();
    }
    match parse(html) {
        Ok(doc) => doc,
        Err(failure) => {
            tracing::warn!(
                offset = failure.offset,
                reason = failure.reason,
                "html parse failed, using plain-text fallback"
            );
            fallback(html)
        }
    }
}

/// Lossy input such as invalid UTF-8 goes through the same path.
pub fn deserialize_bytes(bytes: &[u8]) -> Document {
    deserialize(&String::from_utf8_lossy(bytes))
}

/// Strips tags and makes a paragraph of each non-empty line. When nothing
/// is left the raw input becomes a single paragraph.
pub fn fallback(html: &str) -> Document {
    let text = parse::decode_entities(&strip_tags(html));
    let blocks: Vec<Node> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Node::paragraph)
        .collect();
    if blocks.is_empty() {
        return Document::from_blocks(vec![Node::paragraph(html)]);
    }
    Document::from_blocks(blocks)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        match rest[lt..].find('>') {
            Some(gt) => rest = &rest[lt + gt + 1..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
