//! CLI output formatting for every command.
//!
//! Output leads with the note or post (its file name) and shows paths and
//! errors as indented context lines, so a batch reads as a list of what
//! happened to which note.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! Inventory: 12 posts → site/md_files_inventory.txt
//! Sync: 3 notes with published posts
//! Gravity Waves.md → updated
//!     Post: site/_posts/Physics/2023-05-01-Gravity Waves.md
//! Optics.md → unchanged
//! Old Notes.md → final, not updated
//! figure.png → skipped (not markdown)
//! Broken.md → failed
//!     Error: IO error: permission denied
//!
//! 1 processed (0 created, 1 updated), 2 unchanged, 1 skipped, 1 failed
//! ```
//!
//! ## Summarize
//!
//! ```text
//! 2023-05-01-Gravity Waves.md → description added
//!     Description: How ripples in spacetime carry energy...
//! 2023-06-01-Optics.md → skipped (already has a description)
//!
//! 2 examined, 1 added, 1 skipped, 0 failed
//! ```
//!
//! ## Inventory
//!
//! ```text
//! Posts (2)
//! 001 Gravity Waves
//!     Source: Physics/2023-05-01-Gravity Waves.md
//! 002 Optics
//!     Source: 2023-06-01-Optics.md
//! ```
//!
//! # Architecture
//!
//! Each command has `format_*` functions (returning `Vec<String>`) for
//! testability and `print_*` wrappers that write to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport};
use crate::inventory::Inventory;
use crate::naming;
use crate::reconcile::Outcome;
use crate::summarize::{SkipReason, SummarizeEvent, SummarizeReport};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Last path component, or the whole path when there is none.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::InventoryBuilt { posts, report } => {
            vec![format!("Inventory: {} posts \u{2192} {}", posts, report.display())]
        }
        BatchEvent::SyncPlanned { notes } => {
            vec![format!("Sync: {} notes with published posts", notes)]
        }
        BatchEvent::Converted { source, outcome } => {
            let name = display_name(source);
            match outcome {
                Outcome::Created(post) => vec![
                    format!("{} \u{2192} created", name),
                    format!("{}Post: {}", indent(1), post.display()),
                ],
                Outcome::Updated(post) => vec![
                    format!("{} \u{2192} updated", name),
                    format!("{}Post: {}", indent(1), post.display()),
                ],
                Outcome::Locked(_) => vec![format!("{} \u{2192} final, not updated", name)],
            }
        }
        BatchEvent::Unchanged { source } => {
            vec![format!("{} \u{2192} unchanged", display_name(source))]
        }
        BatchEvent::Skipped { path } => {
            vec![format!("{} \u{2192} skipped (not markdown)", display_name(path))]
        }
        BatchEvent::Failed { source, error } => vec![
            format!("{} \u{2192} failed", display_name(source)),
            format!("{}Error: {}", indent(1), error),
        ],
        BatchEvent::NotFound { query } => {
            vec![format!("No file or folder matching \"{}\"", query)]
        }
        BatchEvent::Quit => vec!["Quit, nothing converted".to_string()],
    }
}

pub fn print_batch_event(event: &BatchEvent) {
    print_lines(format_batch_event(event));
}

/// End-of-batch summary, preceded by a blank separator line.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    vec![String::new(), report.to_string()]
}

pub fn print_batch_report(report: &BatchReport) {
    print_lines(format_batch_report(report));
}

// ============================================================================
// Summarize
// ============================================================================

pub fn format_summarize_event(event: &SummarizeEvent) -> Vec<String> {
    match event {
        SummarizeEvent::Added { path, description } => vec![
            format!("{} \u{2192} description added", display_name(path)),
            format!("{}Description: {}", indent(1), truncate_desc(description, 50)),
        ],
        SummarizeEvent::Skipped { path, reason } => {
            let why = match reason {
                SkipReason::NoMetadata => "no metadata block",
                SkipReason::HasDescription => "already has a description",
            };
            vec![format!("{} \u{2192} skipped ({})", display_name(path), why)]
        }
        SummarizeEvent::Failed { path, error } => vec![
            format!("{} \u{2192} failed", display_name(path)),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

pub fn print_summarize_event(event: &SummarizeEvent) {
    print_lines(format_summarize_event(event));
}

pub fn format_summarize_report(report: &SummarizeReport) -> Vec<String> {
    vec![String::new(), report.to_string()]
}

pub fn print_summarize_report(report: &SummarizeReport) {
    print_lines(format_summarize_report(report));
}

// ============================================================================
// Inventory
// ============================================================================

/// Indexed posts in title order, with paths relative to `posts_root`.
pub fn format_inventory(inventory: &Inventory, posts_root: &Path) -> Vec<String> {
    let mut lines = vec![format!("Posts ({})", inventory.len())];
    for (i, entry) in inventory.iter().enumerate() {
        let rel = entry.path.strip_prefix(posts_root).unwrap_or(&entry.path);
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            naming::strip_markdown_extension(&entry.title)
        ));
        lines.push(format!("{}Source: {}", indent(1), rel.display()));
    }
    lines
}

pub fn print_inventory(inventory: &Inventory, posts_root: &Path) {
    print_lines(format_inventory(inventory, posts_root));
}
