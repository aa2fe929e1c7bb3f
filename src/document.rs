//! Metadata block / body splitting.
//!
//! A document is an optional metadata block followed by a body. The block is
//! fenced by `---` marker lines. Notes sometimes carry several stacked blocks
//! (an Obsidian block followed by a leftover Jekyll block, for example), so
//! the split point is the **last** marker line that appears before the first
//! `## ` section heading:
//!
//! ```text
//! ---            ┐
//! created: ...   │
//! ---            │ metadata part
//! extra: x       │
//! ---            ┘
//! body...          body part
//! ## Section
//! ---              (after the first section heading: stays in the body)
//! ```
//!
//! Field reading is line-based and deliberately forgiving: this is not a YAML
//! parser, and malformed blocks degrade to "field absent".

use regex::Regex;
use std::sync::LazyLock;

/// The fixed marker line delimiting a metadata block.
pub const MARKER: &str = "---";

/// Leading metadata block: `---` line, content, `---` line.
static LEADING_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)").unwrap());

/// A document split into its verbatim metadata part and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    /// Everything up to and including the final marker line (with its newline).
    /// Empty when the document has no metadata block.
    pub metadata: &'a str,
    /// The rest of the document.
    pub body: &'a str,
}

/// Split a document into metadata part and body.
///
/// Mirrors the definition in the module docs. When the document does not
/// start with a marker, or carries fewer than two marker lines, the whole
/// text is body.
pub fn split(text: &str) -> Split<'_> {
    let no_metadata = Split {
        metadata: "",
        body: text,
    };
    if !text.trim_start().starts_with(MARKER) {
        return no_metadata;
    }

    let mut markers = Vec::new();
    let mut first_heading = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == MARKER {
            markers.push(offset + line.len());
        } else if first_heading.is_none() && trimmed.starts_with("## ") {
            first_heading = Some(offset);
        }
        offset += line.len();
    }

    let before_heading: Vec<usize> = markers
        .into_iter()
        .filter(|&end| first_heading.is_none_or(|heading| end <= heading))
        .collect();

    match before_heading.as_slice() {
        [_, .., end] => Split {
            metadata: &text[..*end],
            body: &text[*end..],
        },
        _ => no_metadata,
    }
}

/// Content of the leading metadata block (between the first two markers),
/// without the markers. `None` when the document has no leading block.
pub fn leading_block(text: &str) -> Option<&str> {
    LEADING_BLOCK_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text following the leading metadata block. Whole text when there is none.
pub fn after_leading_block(text: &str) -> &str {
    match LEADING_BLOCK_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Raw value of `key` in a metadata block, trimmed.
///
/// Returns `None` when the key is missing or its value is empty. A
/// double-quoted value that does not close on its own line continues onto
/// the following lines until the closing quote, so multi-line descriptions
/// come back whole.
pub fn field(block: &str, key: &str) -> Option<String> {
    let mut lines = block.lines();
    while let Some(line) = lines.next() {
        let Some(value) = field_on_line(line, key) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if value.starts_with('"') && !closes_quote(value, true) {
            let mut joined = value.to_string();
            for next in lines.by_ref() {
                joined.push('\n');
                joined.push_str(next);
                if closes_quote(next, false) {
                    break;
                }
            }
            return Some(joined);
        }
        return Some(value.to_string());
    }
    None
}

/// Whether the metadata block contains a line for `key` at all.
pub fn has_field(block: &str, key: &str) -> bool {
    block.lines().any(|line| field_on_line(line, key).is_some())
}

/// `block` with every line declaring `key` removed, including the
/// continuation lines of a multi-line quoted value.
pub fn without_field(block: &str, key: &str) -> String {
    let mut kept = Vec::new();
    let mut lines = block.lines();
    while let Some(line) = lines.next() {
        let Some(value) = field_on_line(line, key) else {
            kept.push(line);
            continue;
        };
        let value = value.trim();
        if value.starts_with('"') && !closes_quote(value, true) {
            for next in lines.by_ref() {
                if closes_quote(next, false) {
                    break;
                }
            }
        }
    }
    kept.join("\n")
}

/// Value part of `line` when it declares `key`.
fn field_on_line<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.trim_start()
        .strip_prefix(key)?
        .trim_start_matches([' ', '\t'])
        .strip_prefix(':')
}

/// Whether a quoted fragment ends with an unescaped closing quote.
///
/// `opening` means the fragment starts with the opening quote itself, which
/// must not be counted as the close.
fn closes_quote(fragment: &str, opening: bool) -> bool {
    let body = if opening { &fragment[1..] } else { fragment };
    let trimmed = body.trim_end();
    if !trimmed.ends_with('"') {
        return false;
    }
    let backslashes = trimmed[..trimmed.len() - 1]
        .chars()
        .rev()
        .take_while(|&c| c == '\\')
        .count();
    backslashes % 2 == 0
}
