//! Math delimiter normalization.
//!
//! Obsidian uses `$$` for display math and `$` for inline math, with the same
//! marker opening and closing a span. Chirpy (kramdown + MathJax) wants a
//! uniform `$$` fence, with display math sitting in its own paragraph.
//!
//! # Stages
//!
//! ```text
//! 1. convert_delimiters   $$ → \\[ / \\]   then   $ → \\( / \\)
//! 2. fix_math_content     inside each span: "{{" → "{ {", |x| → \lvert x\rvert
//! 3. space_block_math     one blank line around \\[ ... \\] unless the span sits
//!                         inside a line of text, collapse blank runs
//! 4. replace_with_dollars every intermediate marker → $$
//! ```
//!
//! Open and close are told apart purely by parity: the first marker opens,
//! the second closes, and so on. The count is local to each call, and the
//! vertical-bar count is local to each math span. An odd number of markers
//! leaves the last span unclosed; the output is then undefined formatting
//! and is not repaired.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Intermediate marker for an opening display fence: `\\[`.
pub const OPEN_BLOCK: &str = "\\\\[";
/// Intermediate marker for a closing display fence: `\\]`.
pub const CLOSE_BLOCK: &str = "\\\\]";
/// Intermediate marker for an opening inline fence: `\\(`.
pub const OPEN_INLINE: &str = "\\\\(";
/// Intermediate marker for a closing inline fence: `\\)`.
pub const CLOSE_INLINE: &str = "\\\\)";

/// The canonical fence of the target dialect.
pub const FENCE: &str = "$$";

static BLOCK_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\\\\\[)(.+?)(\\\\\])").unwrap());
static INLINE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\\\\\()(.+?)(\\\\\))").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t\r]*\n){2,}").unwrap());

/// Replace `$$` and then `$` with alternating open/close intermediate markers.
pub fn convert_delimiters(text: &str) -> String {
    let text = alternate(text, "$$", OPEN_BLOCK, CLOSE_BLOCK);
    alternate(&text, "$", OPEN_INLINE, CLOSE_INLINE)
}

/// Replace each occurrence of `needle`, odd occurrences with `open` and even
/// ones with `close`.
fn alternate(text: &str, needle: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut count = 0usize;
    let mut rest = text;
    while let Some(idx) = rest.find(needle) {
        out.push_str(&rest[..idx]);
        count += 1;
        out.push_str(if count % 2 == 1 { open } else { close });
        rest = &rest[idx + needle.len()..];
    }
    out.push_str(rest);
    out
}

/// Apply the in-span fixups to every display span, then every inline span.
///
/// Text outside math spans is never touched.
pub fn fix_math_content(text: &str) -> String {
    let fix = |caps: &Captures| format!("{}{}{}", &caps[1], fix_span(&caps[2]), &caps[3]);
    let text = BLOCK_SPAN_RE.replace_all(text, fix);
    INLINE_SPAN_RE.replace_all(&text, fix).into_owned()
}

/// Fixups for a single math span. The bar parity restarts for every span.
fn fix_span(content: &str) -> String {
    let content = separate_braces(content)
        .replace("\\left|", "\\lvert ")
        .replace("\\right|", "\\rvert ");
    pair_vertical_bars(&content)
}

/// Put a space between every two adjacent `{`.
///
/// kramdown reads `{{` as the start of a Liquid-like construct in some
/// contexts; `{ {` is equivalent TeX.
fn separate_braces(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 4);
    let mut prev = None;
    for c in content.chars() {
        if c == '{' && prev == Some('{') {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Turn unescaped `|` into `\lvert ` / `\rvert ` by parity.
///
/// A bare `|` inside a markdown paragraph is read as a table cell separator.
fn pair_vertical_bars(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 8);
    let mut count = 0usize;
    let mut prev = None;
    for c in content.chars() {
        if c == '|' && prev != Some('\\') {
            count += 1;
            out.push_str(if count % 2 == 1 { "\\lvert " } else { "\\rvert " });
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Ensure exactly one blank line before every opening display marker and
/// after every closing one, then collapse runs of blank lines.
///
/// A display span that opens and closes on a line shared with other text
/// stays where it is: that is how an inline span reads once its fences are
/// `$$`. Lines holding only spaces or tabs count as blank.
pub fn space_block_math(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    let mut rest = text;

    while let Some((idx, marker)) = next_block_marker(rest) {
        let before = &rest[..idx];
        let after = &rest[idx + marker.len()..];

        if marker == OPEN_BLOCK {
            out.push_str(before);
            if let Some(end) = embedded_span_end(current_line(&out), after) {
                out.push_str(marker);
                out.push_str(&after[..end]);
                rest = &after[end..];
                continue;
            }
            rest = after;
            let kept = out.trim_end().len();
            out.truncate(kept);
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(marker);
        } else {
            out.push_str(before);
            out.push_str(marker);
            rest = strip_leading_blank_lines(after);
            if rest.trim().is_empty() {
                rest = "";
                out.push('\n');
            } else {
                out.push_str("\n\n");
            }
        }
    }
    out.push_str(rest);

    collapse_blank_lines(&out)
}

/// Text of the last (unfinished) line of `out`.
fn current_line(out: &str) -> &str {
    out.rfind('\n').map_or(out, |nl| &out[nl + 1..])
}

/// End offset (in `after_open`, past the closing marker) of a display span
/// that closes on the line it opened on, when that line also carries other
/// text. `None` for a span that should be laid out as a block.
fn embedded_span_end(line_before: &str, after_open: &str) -> Option<usize> {
    let close = after_open.find(CLOSE_BLOCK)?;
    let content = &after_open[..close];
    if content.contains('\n') || content.contains(OPEN_BLOCK) {
        return None;
    }
    let end = close + CLOSE_BLOCK.len();
    let line_after = after_open[end..].split('\n').next().unwrap_or("");
    (!line_before.trim().is_empty() || !line_after.trim().is_empty()).then_some(end)
}

/// Find the earliest display marker in `text`.
fn next_block_marker(text: &str) -> Option<(usize, &'static str)> {
    let open = text.find(OPEN_BLOCK).map(|i| (i, OPEN_BLOCK));
    let close = text.find(CLOSE_BLOCK).map(|i| (i, CLOSE_BLOCK));
    match (open, close) {
        (Some(o), Some(c)) => Some(if o.0 <= c.0 { o } else { c }),
        (o, c) => o.or(c),
    }
}

/// Drop the rest of the current line if it is blank, plus any blank lines
/// that follow. Leading spaces of the first non-blank line are trimmed only
/// when that line is the marker's own line.
fn strip_leading_blank_lines(mut text: &str) -> &str {
    text = text.trim_start_matches([' ', '\t']);
    while let Some(nl) = text.find('\n') {
        if text[..nl].trim().is_empty() {
            text = &text[nl + 1..];
        } else {
            break;
        }
    }
    text
}

/// Collapse every run of two or more blank lines into a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}

/// Replace every intermediate marker with the canonical `$$` fence.
pub fn replace_with_dollars(text: &str) -> String {
    [OPEN_BLOCK, CLOSE_BLOCK, OPEN_INLINE, CLOSE_INLINE]
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, FENCE))
}

/// Run all four stages in order.
pub fn normalize(text: &str) -> String {
    let text = convert_delimiters(text);
    let text = fix_math_content(&text);
    let text = space_block_math(&text);
    replace_with_dollars(&text)
}
