//! New post or update of an existing one.
//!
//! A note is matched against the [`Inventory`] by title (file name without
//! extension, case-insensitive):
//!
//! ```text
//! note ──lookup──▶ no match ──▶ CREATE  full pipeline, write
//!                                       <output>/<YYYY-MM-DD->name.md
//!                  match ─────▶ locked?  final_version: true ──▶ skip
//!                                 │
//!                                 └────▶ UPDATE  keep the post's metadata,
//!                                                refresh last_modified_at,
//!                                                replace the body
//! ```
//!
//! On UPDATE the published post keeps its own metadata block verbatim (its
//! `date`, categories, tags and description all survive). Only
//! `last_modified_at` is refreshed, from the note's `updated` field, and the
//! body is replaced by the freshly converted one. A post whose metadata
//! carries a truthy `final_version` is never written to.

use crate::decision::DecisionProvider;
use crate::document;
use crate::frontmatter::{self, DescriptionPolicy, Timestamp};
use crate::inventory::Inventory;
use crate::naming;
use crate::pipeline::Pipeline;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static LOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?im)^\s*final_version\s*:\s*["']?(?:true|yes)\b"#).unwrap());

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a file name: {0}")]
    NoFileName(PathBuf),
}

/// What happened to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(PathBuf),
    Updated(PathBuf),
    /// The matching post is locked with `final_version`; nothing written.
    Locked(PathBuf),
}

/// Whether a metadata block marks its post as final.
pub fn is_locked(metadata: &str) -> bool {
    LOCK_RE.is_match(metadata)
}

/// Set `last_modified_at` in a verbatim metadata part.
///
/// An existing `last_modified_at` line is replaced. Otherwise the field goes
/// directly after the `date` line, or before the closing marker when there
/// is no `date`.
pub fn splice_last_modified(metadata: &str, value: &str) -> String {
    let field_line = format!("last_modified_at: {value}\n");
    let mut lines: Vec<&str> = metadata.split_inclusive('\n').collect();

    let declares = |line: &str, key: &str| {
        line.trim_start()
            .strip_prefix(key)
            .is_some_and(|rest| rest.trim_start().starts_with(':'))
    };

    if let Some(idx) = lines.iter().position(|l| declares(l, "last_modified_at")) {
        lines[idx] = &field_line;
    } else if let Some(idx) = lines.iter().position(|l| declares(l, "date")) {
        lines.insert(idx + 1, &field_line);
    } else if let Some(idx) = lines.iter().rposition(|l| l.trim() == document::MARKER) {
        lines.insert(idx, &field_line);
    }
    lines.concat()
}

/// Converts notes and writes them into the posts tree.
pub struct Publisher<'a> {
    pipeline: Pipeline<'a>,
    inventory: Inventory,
    output_dir: PathBuf,
    description: Option<DescriptionPolicy<'a>>,
}

impl<'a> Publisher<'a> {
    /// `description` applies to newly created posts only.
    pub fn new(
        pipeline: Pipeline<'a>,
        inventory: Inventory,
        output_dir: impl Into<PathBuf>,
        description: Option<DescriptionPolicy<'a>>,
    ) -> Self {
        Self {
            pipeline,
            inventory,
            output_dir: output_dir.into(),
            description,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Create or update the post for `source`, deciding by inventory lookup.
    pub fn publish(
        &mut self,
        source: &Path,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<Outcome, PublishError> {
        let file_name = file_name(source)?;
        let input = fs::read_to_string(source)?;
        match self.inventory.lookup(&file_name) {
            Some(entry) => {
                let post = entry.path.clone();
                self.update(source, &input, &post, decisions)
            }
            None => self.create(source, &file_name, &input, decisions),
        }
    }

    /// Update a known post from `source` without consulting the inventory.
    pub fn update_post(
        &mut self,
        source: &Path,
        post: &Path,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<Outcome, PublishError> {
        let input = fs::read_to_string(source)?;
        self.update(source, &input, post, decisions)
    }

    fn update(
        &mut self,
        source: &Path,
        input: &str,
        post: &Path,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<Outcome, PublishError> {
        let existing = fs::read_to_string(post)?;
        let metadata = document::split(&existing).metadata;
        if is_locked(metadata) {
            log::info!("[publish] {} is final, not updated", post.display());
            return Ok(Outcome::Locked(post.to_path_buf()));
        }

        let updated = document::leading_block(input)
            .and_then(|block| document::field(block, "updated"))
            .map(|raw| Timestamp::parse(&raw).render());
        let metadata = match &updated {
            Some(value) if !metadata.is_empty() => splice_last_modified(metadata, value),
            _ => metadata.to_string(),
        };

        let converted = self.pipeline.assemble(input, Some(source), None, decisions);
        let output = if metadata.is_empty() {
            converted
        } else {
            let body = document::after_leading_block(&converted).trim_start_matches('\n');
            format!("{}\n{body}", with_trailing_newline(metadata))
        };
        fs::write(post, output)?;
        if let Some(value) = updated {
            log::debug!("[publish] {} last_modified_at → {value}", post.display());
        }
        Ok(Outcome::Updated(post.to_path_buf()))
    }

    fn create(
        &mut self,
        source: &Path,
        file_name: &str,
        input: &str,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<Outcome, PublishError> {
        let converted = self
            .pipeline
            .assemble(input, Some(source), self.description.as_ref(), decisions);
        let date = frontmatter::extract_date(&converted);
        let path = self
            .output_dir
            .join(naming::dated_file_name(date.as_deref(), file_name));

        fs::create_dir_all(&self.output_dir)?;
        fs::write(&path, converted)?;
        self.inventory.insert(&path);
        Ok(Outcome::Created(path))
    }
}

fn file_name(path: &Path) -> Result<String, PublishError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PublishError::NoFileName(path.to_path_buf()))
}

fn with_trailing_newline(text: String) -> String {
    if text.ends_with('\n') {
        text
    } else {
        text + "\n"
    }
}
