//! Description backfill for already-published posts.
//!
//! Walks the posts root and asks the [`Summarizer`] for a description for
//! every post that lacks one:
//!
//! ```text
//! post ─▶ category filter ─▶ limit ─▶ no metadata?      skip
//!                                     has description?  skip (unless --all)
//!                                     summarize body ─▶ description: "..."
//! ```
//!
//! The description becomes the last field of the leading metadata block; an
//! existing one is replaced rather than duplicated. Requests are spaced by
//! `summary.request_interval_ms`.

use crate::config::Config;
use crate::document;
use crate::frontmatter;
use crate::inventory;
use crate::summary::{self, Summarizer};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

static CATEGORIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*categories:\s*\[(.*?)\]").unwrap());

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Posts directory not found: {0}")]
    MissingPostsRoot(PathBuf),
}

/// Flags of a `summarize` run.
#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    /// Replace descriptions that already exist.
    pub all: bool,
    /// Stop after examining this many posts.
    pub limit: Option<usize>,
    /// Only posts whose `categories` list names this category.
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoMetadata,
    HasDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizeEvent {
    Added { path: PathBuf, description: String },
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: String },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SummarizeReport {
    pub examined: u32,
    pub added: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl fmt::Display for SummarizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} examined, {} added, {} skipped, {} failed",
            self.examined, self.added, self.skipped, self.failed
        )
    }
}

/// Whether the metadata block lists `category` in `categories: [..]`.
pub fn in_category(block: &str, category: &str) -> bool {
    let Some(caps) = CATEGORIES_RE.captures(block) else {
        return false;
    };
    let wanted = category.to_lowercase();
    caps[1]
        .split(',')
        .map(|c| c.trim().trim_matches(['"', '\'']))
        .any(|c| c.to_lowercase() == wanted)
}

/// Rewrite `text` so its leading block ends with `description: "<summary>"`.
/// `None` when the text has no leading block.
pub fn set_description(text: &str, summary: &str) -> Option<String> {
    let block = document::leading_block(text)?;
    let body = document::after_leading_block(text);
    let mut fields = document::without_field(block, "description")
        .trim_end()
        .to_string();
    if !fields.is_empty() {
        fields.push('\n');
    }
    Some(format!(
        "{marker}\n{fields}description: \"{}\"\n{marker}\n{body}",
        frontmatter::escape_quoted(summary.trim()),
        marker = document::MARKER,
    ))
}

/// Backfill descriptions under the configured posts root.
pub fn backfill(
    config: &Config,
    options: &SummarizeOptions,
    summarizer: &dyn Summarizer,
    on_event: &mut dyn FnMut(&SummarizeEvent),
) -> Result<SummarizeReport, SummarizeError> {
    let root = &config.paths.posts;
    if !root.is_dir() {
        return Err(SummarizeError::MissingPostsRoot(root.clone()));
    }
    let interval = Duration::from_millis(config.summary.request_interval_ms);
    let max_length = config.summary.max_length;

    let mut report = SummarizeReport::default();
    let mut requested = false;
    for path in inventory::markdown_files(root) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                fail(&mut report, on_event, &path, e.to_string());
                continue;
            }
        };
        let block = document::leading_block(&text);
        if let Some(category) = &options.category {
            if !block.is_some_and(|b| in_category(b, category)) {
                continue;
            }
        }
        if options.limit.is_some_and(|limit| report.examined as usize >= limit) {
            break;
        }
        report.examined += 1;

        let reason = match block {
            None => Some(SkipReason::NoMetadata),
            Some(b) if !options.all && document::field(b, "description").is_some() => {
                Some(SkipReason::HasDescription)
            }
            _ => None,
        };
        if let Some(reason) = reason {
            report.skipped += 1;
            on_event(&SummarizeEvent::Skipped { path, reason });
            continue;
        }

        if requested && !interval.is_zero() {
            std::thread::sleep(interval);
        }
        requested = true;
        let content = summary::prepare_content(document::after_leading_block(&text));
        match summarize_one(&path, &text, &content, max_length, summarizer) {
            Ok(description) => {
                report.added += 1;
                on_event(&SummarizeEvent::Added { path, description });
            }
            Err(error) => fail(&mut report, on_event, &path, error),
        }
    }
    Ok(report)
}

fn summarize_one(
    path: &Path,
    text: &str,
    content: &str,
    max_length: usize,
    summarizer: &dyn Summarizer,
) -> Result<String, String> {
    let description = summarizer
        .generate_summary(content, max_length)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "no summary generated".to_string())?;
    let updated = set_description(text, &description).ok_or_else(|| "no metadata block".to_string())?;
    fs::write(path, updated).map_err(|e| e.to_string())?;
    Ok(description.trim().to_string())
}

fn fail(
    report: &mut SummarizeReport,
    on_event: &mut dyn FnMut(&SummarizeEvent),
    path: &Path,
    error: String,
) {
    log::warn!("[summarize] {}: {error}", path.display());
    report.failed += 1;
    on_event(&SummarizeEvent::Failed {
        path: path.to_path_buf(),
        error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingSummary, FixedSummary, Workspace};

    fn config(ws: &Workspace) -> Config {
        let mut config = ws.config();
        config.summary.request_interval_ms = 0;
        config
    }

    fn run(ws: &Workspace, options: &SummarizeOptions, summarizer: &dyn Summarizer) -> SummarizeReport {
        backfill(&config(ws), options, summarizer, &mut |_| {}).unwrap()
    }

    // =========================================================================
    // Metadata editing
    // =========================================================================

    #[test]
    fn description_appended_as_last_field() {
        let out = set_description("---\ntitle: x\ntags: [a]\n---\n\nBody\n", "Short \"quoted\"").unwrap();
        assert_eq!(
            out,
            "---\ntitle: x\ntags: [a]\ndescription: \"Short \\\"quoted\\\"\"\n---\n\nBody\n"
        );
    }

    #[test]
    fn existing_description_replaced() {
        let out = set_description("---\ndescription: \"old\nlines\"\ntitle: x\n---\nBody\n", "new").unwrap();
        assert_eq!(out, "---\ntitle: x\ndescription: \"new\"\n---\nBody\n");
    }

    #[test]
    fn no_block_no_rewrite() {
        assert_eq!(set_description("Just text\n", "x"), None);
    }

    #[test]
    fn category_matching() {
        assert!(in_category("categories: [Physics, \"Math\"]\n", "math"));
        assert!(!in_category("categories: [Mathematics]\n", "math"));
        assert!(!in_category("title: x\n", "math"));
    }

    // =========================================================================
    // Backfill runs
    // =========================================================================

    #[test]
    fn adds_missing_descriptions_only() {
        let ws = Workspace::new();
        let plain = ws.post("2024-01-01-A.md", "---\ntitle: A\n---\n\nAlpha text\n");
        let described = ws.post("2024-01-02-B.md", "---\ntitle: B\ndescription: \"kept\"\n---\nBeta\n");
        ws.post("2024-01-03-C.md", "No metadata here\n");
        let summarizer = FixedSummary::new("About alpha");

        let report = run(&ws, &SummarizeOptions::default(), &summarizer);
        assert_eq!(
            report,
            SummarizeReport {
                examined: 3,
                added: 1,
                skipped: 2,
                failed: 0
            }
        );
        assert_eq!(
            fs::read_to_string(plain).unwrap(),
            "---\ntitle: A\ndescription: \"About alpha\"\n---\n\nAlpha text\n"
        );
        assert!(fs::read_to_string(described).unwrap().contains("description: \"kept\""));
        assert_eq!(summarizer.calls(), 1);
    }

    #[test]
    fn all_replaces_existing() {
        let ws = Workspace::new();
        let post = ws.post("2024-01-02-B.md", "---\ntitle: B\ndescription: \"old\"\n---\nBeta\n");
        let options = SummarizeOptions {
            all: true,
            ..SummarizeOptions::default()
        };
        let report = run(&ws, &options, &FixedSummary::new("fresh"));
        assert_eq!(report.added, 1);
        assert_eq!(
            fs::read_to_string(post).unwrap(),
            "---\ntitle: B\ndescription: \"fresh\"\n---\nBeta\n"
        );
    }

    #[test]
    fn limit_and_category_filter() {
        let ws = Workspace::new();
        ws.post("2024-01-01-A.md", "---\ncategories: [Physics]\n---\nA\n");
        ws.post("2024-01-02-B.md", "---\ncategories: [Math]\n---\nB\n");
        ws.post("2024-01-03-C.md", "---\ncategories: [Physics]\n---\nC\n");
        let summarizer = FixedSummary::new("s");

        let options = SummarizeOptions {
            all: false,
            limit: Some(1),
            category: Some("physics".to_string()),
        };
        let report = run(&ws, &options, &summarizer);
        assert_eq!(report.examined, 1);
        assert_eq!(report.added, 1);
        assert!(fs::read_to_string(ws.posts().join("2024-01-01-A.md")).unwrap().contains("description"));
        assert!(!fs::read_to_string(ws.posts().join("2024-01-03-C.md")).unwrap().contains("description"));
        assert!(!fs::read_to_string(ws.posts().join("2024-01-02-B.md")).unwrap().contains("description"));
    }

    #[test]
    fn failed_summary_leaves_post_untouched() {
        let ws = Workspace::new();
        let original = "---\ntitle: A\n---\nA\n";
        let post = ws.post("2024-01-01-A.md", original);
        let mut events = Vec::new();
        let report = backfill(
            &config(&ws),
            &SummarizeOptions::default(),
            &FailingSummary,
            &mut |e| events.push(e.clone()),
        )
        .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(fs::read_to_string(&post).unwrap(), original);
        assert!(matches!(&events[0], SummarizeEvent::Failed { path, .. } if *path == post));
    }

    #[test]
    fn missing_posts_root_is_error() {
        let ws = Workspace::new();
        let mut config = config(&ws);
        config.paths.posts = ws.root().join("nope");
        let result = backfill(&config, &SummarizeOptions::default(), &FixedSummary::new("x"), &mut |_| {});
        assert!(matches!(result, Err(SummarizeError::MissingPostsRoot(_))));
    }

    #[test]
    fn report_display() {
        let report = SummarizeReport {
            examined: 4,
            added: 2,
            skipped: 1,
            failed: 1,
        };
        assert_eq!(report.to_string(), "4 examined, 2 added, 1 skipped, 1 failed");
    }
}
