//! Title index over the published posts.
//!
//! The inventory answers one question: has a note with this title been
//! published already, and where? It is rebuilt from scratch on every run by
//! walking the posts root. Only dated files (`YYYY-MM-DD-<title>.md`) are
//! indexed, under their title with the date prefix removed.
//!
//! A human-readable report is written next to the posts root as a side
//! effect:
//!
//! ```text
//! # Post inventory - updated 2024-05-01 10:00:00
//!
//! * Gravity Waves.md: /site/_posts/Physics/2023-05-01-Gravity Waves.md
//! ```
//!
//! The report is also the input of a full sync: [`find_source_files`] reads
//! it back and pairs every listed post with the vault note of the same title.

use crate::naming::{self, parse_post_name, title_key};
use crate::store::header_timestamp;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// File name with the date prefix removed, extension kept.
    pub title: String,
    pub path: PathBuf,
}

/// Title key → published post.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: BTreeMap<String, InventoryEntry>,
}

impl Inventory {
    /// Index every dated markdown file under `posts_root`.
    ///
    /// A missing root yields an empty inventory. When two posts share a
    /// title, the one walked last wins.
    pub fn scan(posts_root: &Path) -> Self {
        let mut inventory = Self::default();
        for path in markdown_files(posts_root) {
            inventory.insert(&path);
        }
        inventory
    }

    /// Index `path` if its file name carries a date prefix.
    pub fn insert(&mut self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let parsed = parse_post_name(file_name);
        if parsed.date.is_none() || parsed.name.is_empty() {
            return false;
        }
        self.entries.insert(
            title_key(&parsed.name),
            InventoryEntry {
                title: parsed.name,
                path: path.to_path_buf(),
            },
        );
        true
    }

    /// Published post whose title matches `file_name` (extension and case
    /// ignored).
    pub fn lookup(&self, file_name: &str) -> Option<&InventoryEntry> {
        self.entries.get(&title_key(file_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.values()
    }

    /// Report text, one `* <title>: <path>` line per entry.
    pub fn report(&self) -> String {
        let mut out = format!("# Post inventory - updated {}\n\n", header_timestamp());
        for entry in self.entries.values() {
            out.push_str(&format!("* {}: {}\n", entry.title, entry.path.display()));
        }
        out
    }

    pub fn write_report(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.report())
    }
}

/// Post paths listed in an inventory report, keyed by title key.
///
/// The title is re-derived from each listed path's file name, so only dated
/// posts come back. A missing report reads as empty.
pub fn read_report(report: &Path) -> io::Result<BTreeMap<String, PathBuf>> {
    if !report.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(report)?;
    let posts = content
        .lines()
        .filter_map(|line| line.strip_prefix("* "))
        .filter_map(|line| line.split_once(": "))
        .filter_map(|(_, path)| {
            let path = PathBuf::from(path.trim());
            let file_name = path.file_name()?.to_str()?;
            let parsed = parse_post_name(file_name);
            parsed.date.as_ref()?;
            Some((title_key(&parsed.name), path))
        })
        .collect();
    Ok(posts)
}

/// Pair vault notes with the posts listed in `report`.
///
/// Returns `(source note, published post)` pairs in source path order.
pub fn find_source_files(report: &Path, source_root: &Path) -> io::Result<Vec<(PathBuf, PathBuf)>> {
    let posts = read_report(report)?;
    if posts.is_empty() {
        return Ok(Vec::new());
    }
    let pairs = markdown_files(source_root)
        .into_iter()
        .filter_map(|source| {
            let file_name = source.file_name()?.to_str()?;
            let post = posts.get(&title_key(file_name))?.clone();
            Some((source, post))
        })
        .collect();
    Ok(pairs)
}

/// Every file under `root`, sorted, skipping hidden entries such as the
/// `.obsidian` settings folder. A missing root yields nothing.
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Markdown files under `root`, sorted.
pub fn markdown_files(root: &Path) -> Vec<PathBuf> {
    walk_files(root)
        .into_iter()
        .filter(|p| naming::is_markdown(p))
        .collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
