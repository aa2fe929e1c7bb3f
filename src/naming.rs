//! Post filename conventions.
//!
//! Jekyll posts are named `YYYY-MM-DD-<title>.md`. A source note is named
//! just `<title>.md`, so matching a note against a published post means
//! stripping the date prefix and comparing what remains:
//!
//! - `2023-05-01-Gravity Waves.md` → date `2023-05-01`, title `Gravity Waves`
//! - `Gravity Waves.md` → no date, title `Gravity Waves`
//!
//! Titles are compared case-insensitively and without extension; see
//! [`title_key`].

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.*)$").unwrap());

/// Markdown extensions, lowercase.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Result of parsing a post filename like `2023-05-01-Gravity Waves.md`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostName {
    /// Date prefix if present (`2023-05-01`).
    pub date: Option<String>,
    /// Everything after the date prefix, extension included.
    /// For undated names, the full input.
    pub name: String,
}

/// Parse a filename following the `YYYY-MM-DD-name` convention.
pub fn parse_post_name(file_name: &str) -> PostName {
    match DATE_PREFIX_RE.captures(file_name) {
        Some(caps) => PostName {
            date: Some(caps[1].to_string()),
            name: caps[2].to_string(),
        },
        None => PostName {
            date: None,
            name: file_name.to_string(),
        },
    }
}

/// Comparison key for a file name: extension dropped, lowercased.
///
/// `Gravity Waves.md` and `gravity waves.markdown` share a key.
pub fn title_key(name: &str) -> String {
    strip_markdown_extension(name).to_lowercase()
}

/// `name` without a trailing `.md`/`.markdown` (any case).
pub fn strip_markdown_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if is_markdown_extension(ext) => stem,
        _ => name,
    }
}

/// Output filename for a newly created post.
pub fn dated_file_name(date: Option<&str>, file_name: &str) -> String {
    match date {
        Some(date) => format!("{date}-{file_name}"),
        None => file_name.to_string(),
    }
}

/// Whether `path` has a markdown extension (case-insensitive).
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(is_markdown_extension)
}

fn is_markdown_extension(ext: &str) -> bool {
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
}

/// Title of a note: its file name without extension.
pub fn note_title(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| strip_markdown_extension(n).to_string())
}
