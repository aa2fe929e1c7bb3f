//! Document assembly.
//!
//! Runs the text transforms over one note in a fixed order:
//!
//! ```text
//! raw note
//!   1. frontmatter::process_frontmatter     rebuild the metadata block
//!   2. ensure_blank_lines_before_callouts   ┐ callout layout,
//!   3. separate_adjacent_callouts           ┘ before detection
//!   4. links::convert_wiki_links
//!   5. CalloutConverter::convert
//!   6. math::normalize                      fences, fixups, spacing, $$
//! output document
//! ```
//!
//! Steps 2-6 only see the body. The rebuilt metadata block is passed
//! through untouched, so a `$` or `[[` inside a description stays literal.

use crate::callout::{self, CalloutConverter};
use crate::decision::DecisionProvider;
use crate::document;
use crate::frontmatter::{self, DescriptionPolicy};
use crate::links;
use crate::math;
use crate::naming;
use std::path::{Path, PathBuf};

/// Converts notes one at a time, carrying callout decisions across notes.
pub struct Pipeline<'a> {
    callouts: CalloutConverter<'a>,
    default_title: String,
    source_root: Option<PathBuf>,
}

impl<'a> Pipeline<'a> {
    pub fn new(callouts: CalloutConverter<'a>, default_title: impl Into<String>) -> Self {
        Self {
            callouts,
            default_title: default_title.into(),
            source_root: None,
        }
    }

    /// Key file-specific callout decisions relative to `root`, so a note
    /// reached through different spellings of its path keeps one key.
    pub fn with_source_root(mut self, root: impl AsRef<Path>) -> Self {
        self.source_root = Some(absolute(root.as_ref()));
        self
    }

    /// Decision key of a note: its path under the source root when it lies
    /// there, its absolute path otherwise. Without a root the path is used
    /// as given.
    pub fn decision_key(&self, source: &Path) -> String {
        let Some(root) = &self.source_root else {
            return source.display().to_string();
        };
        let source = absolute(source);
        match source.strip_prefix(root) {
            Ok(rel) => rel.display().to_string(),
            Err(_) => source.display().to_string(),
        }
    }

    /// Convert the full text of a note.
    ///
    /// `source` supplies the title (file name without extension) and keys
    /// file-specific callout decisions. Without it the default title is used.
    pub fn assemble(
        &mut self,
        text: &str,
        source: Option<&Path>,
        description: Option<&DescriptionPolicy<'_>>,
        decisions: &mut dyn DecisionProvider,
    ) -> String {
        let title = source
            .and_then(naming::note_title)
            .unwrap_or_else(|| self.default_title.clone());
        let file_key = source.map(|p| self.decision_key(p));

        let text = frontmatter::process_frontmatter(text, &title, description);
        let body = document::after_leading_block(&text);
        let metadata = &text[..text.len() - body.len()];

        let body = callout::ensure_blank_lines_before_callouts(body);
        let body = callout::separate_adjacent_callouts(&body);
        let body = links::convert_wiki_links(&body);
        let body = self.callouts.convert(&body, file_key.as_deref(), decisions);
        let body = math::normalize(&body);

        format!("{metadata}{body}")
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
