//! Metadata block normalization.
//!
//! The Obsidian block is rebuilt from scratch into the Chirpy shape. Only two
//! source fields survive, renamed:
//!
//! | Obsidian  | Chirpy             |
//! |-----------|--------------------|
//! | `created` | `date`             |
//! | `updated` | `last_modified_at` |
//!
//! Everything else is dropped and fixed placeholders are emitted, so the
//! output block always reads, in this order:
//!
//! ```text
//! ---
//! title: "<file name>"
//! date: 2024-01-01 10:20:59 +0800        (if present)
//! last_modified_at: ...                  (if present)
//! description: "..."                     (if present or generated)
//! categories:
//! math: true
//! tags:
//! ---
//! ```
//!
//! `date` / `last_modified_at` are accepted as inputs too, so a block that is
//! already in Chirpy shape normalizes to itself.
//!
//! ## Timestamps
//!
//! Values longer than the 19-character `YYYY-MM-DD HH:MM:SS` width carry a
//! timezone suffix, which is split off and reattached verbatim. A seconds
//! field of 60 or more is clamped to 59. This is a guard against malformed
//! exports, not time arithmetic: the minute never rolls over. Each field keeps
//! its own suffix.

use crate::document;
use crate::summary::{self, Summarizer};
use regex::Regex;
use std::sync::LazyLock;

/// Width of a `YYYY-MM-DD HH:MM:SS` timestamp.
pub const TIMESTAMP_WIDTH: usize = 19;

static SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:)(\d{2})$").unwrap());
static DATE_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^date:[ \t]*(\d{4}-\d{2}-\d{2})").unwrap());

/// A normalized timestamp with its timezone suffix kept apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub value: String,
    pub zone: Option<String>,
}

impl Timestamp {
    /// Split off the timezone suffix and clamp the seconds field.
    ///
    /// Values that do not look like a timestamp pass through unchanged.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (value, zone) = match raw.char_indices().nth(TIMESTAMP_WIDTH) {
            Some((cut, _)) => {
                let zone = raw[cut..].trim();
                (&raw[..cut], (!zone.is_empty()).then(|| zone.to_string()))
            }
            None => (raw, None),
        };
        Self {
            value: clamp_seconds(value),
            zone,
        }
    }

    /// Render as `value` or `value zone`.
    pub fn render(&self) -> String {
        match &self.zone {
            Some(zone) => format!("{} {}", self.value, zone),
            None => self.value.clone(),
        }
    }
}

fn clamp_seconds(value: &str) -> String {
    let Some(caps) = SECONDS_RE.captures(value) else {
        return value.to_string();
    };
    match caps[2].parse::<u32>() {
        Ok(secs) if secs >= 60 => format!("{}59", &caps[1]),
        _ => value.to_string(),
    }
}

/// How the processor should treat the `description` field.
pub struct DescriptionPolicy<'a> {
    pub summarizer: &'a dyn Summarizer,
    pub max_length: usize,
    /// Regenerate even when the note already has a description.
    pub overwrite: bool,
}

/// Replace (or synthesize) the leading metadata block of `text`.
///
/// With a `policy`, the summarizer is asked for a description of the body
/// unless one is already present (or `overwrite` is set). An absent summary
/// simply means no new description.
pub fn process_frontmatter(
    text: &str,
    title: &str,
    policy: Option<&DescriptionPolicy<'_>>,
) -> String {
    let Some(block) = document::leading_block(text) else {
        let description = policy.and_then(|p| generate_description(text, p));
        let mut out = String::from("---\n");
        out.push_str(&format!("title: \"{}\"\n", escape_quoted(title)));
        out.push_str("date: \n");
        if let Some(description) = description {
            out.push_str(&format!("description: {description}\n"));
        }
        out.push_str("categories: \nmath: true\ntags: \n---\n\n");
        out.push_str(text);
        return out;
    };

    let body = document::after_leading_block(text).trim_start_matches(['\n', '\r']);

    let created = document::field(block, "created")
        .or_else(|| document::field(block, "date"))
        .map(|raw| Timestamp::parse(&raw));
    let updated = document::field(block, "updated")
        .or_else(|| document::field(block, "last_modified_at"))
        .map(|raw| Timestamp::parse(&raw));

    let existing = document::field(block, "description");
    let description = match policy {
        Some(p) if existing.is_none() || p.overwrite => {
            generate_description(body, p).or(existing)
        }
        _ => existing,
    };

    let mut out = String::from("---\n");
    out.push_str(&format!("title: \"{}\"\n", escape_quoted(title)));
    match &created {
        Some(created) => out.push_str(&format!("date: {}\n", created.render())),
        // Keep the empty placeholder of a previously synthesized block.
        None if document::has_field(block, "date") => out.push_str("date: \n"),
        None => {}
    }
    if let Some(updated) = &updated {
        out.push_str(&format!("last_modified_at: {}\n", updated.render()));
    }
    if let Some(description) = &description {
        out.push_str(&format!("description: {description}\n"));
    }
    out.push_str("categories: \nmath: true\ntags: \n---\n\n");
    out.push_str(body);
    out
}

/// Ask the summarizer and render the result as a quoted YAML value.
fn generate_description(body: &str, policy: &DescriptionPolicy<'_>) -> Option<String> {
    let content = summary::prepare_content(body);
    policy
        .summarizer
        .generate_summary(&content, policy.max_length)
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("\"{}\"", escape_quoted(s.trim())))
}

/// Escape a value for embedding in a double-quoted YAML scalar.
pub fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// The `YYYY-MM-DD` part of the `date` field in the leading metadata block.
pub fn extract_date(text: &str) -> Option<String> {
    let block = document::leading_block(text)?;
    DATE_FIELD_RE
        .captures(block)
        .map(|caps| caps[1].to_string())
}
