//! Shared test utilities for the obsidian2chirpy test suite.
//!
//! Provides scripted collaborators (decision provider, summarizers) and a
//! temporary workspace holding a vault and a posts tree.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let ws = Workspace::new();
//! let note = ws.note("Physics/Gravity Waves.md", "Body\n");
//! ws.post("Physics/2023-05-01-Gravity Waves.md", "---\ntitle: x\n---\n");
//!
//! let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Quote]);
//! let summarizer = FixedSummary::new("A summary");
//! assert_eq!(summarizer.calls(), 0);
//! ```

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use crate::config::{Config, PathsConfig};
use crate::decision::{CalloutDecision, DecisionProvider, TargetChoice};
use crate::store::{KeyValueStore, StoreError};
use crate::summary::Summarizer;
use std::collections::BTreeMap;

// =========================================================================
// Decision provider
// =========================================================================

/// Answers from queues and records what was asked.
///
/// An exhausted callout queue answers `Info`; an exhausted target queue
/// answers `Quit`.
#[derive(Default)]
pub struct ScriptedDecisions {
    callouts: VecDeque<CalloutDecision>,
    targets: VecDeque<TargetChoice>,
    asked: Vec<String>,
    searches: Vec<String>,
}

impl ScriptedDecisions {
    pub fn new(callouts: &[CalloutDecision]) -> Self {
        Self {
            callouts: callouts.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_targets(targets: &[TargetChoice]) -> Self {
        Self {
            targets: targets.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Callout types the provider was asked about, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.clone()
    }

    /// Search queries the provider was asked to disambiguate.
    pub fn searches(&self) -> Vec<String> {
        self.searches.clone()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn resolve_callout(&mut self, kind: &str, _sample: &str) -> CalloutDecision {
        self.asked.push(kind.to_string());
        self.callouts.pop_front().unwrap_or_default()
    }

    fn choose_target(
        &mut self,
        query: &str,
        _folders: &[PathBuf],
        _files: &[PathBuf],
    ) -> TargetChoice {
        self.searches.push(query.to_string());
        self.targets.pop_front().unwrap_or(TargetChoice::Quit)
    }
}

// =========================================================================
// Summarizers
// =========================================================================

/// Always returns the same summary and counts calls.
pub struct FixedSummary {
    summary: String,
    calls: Mutex<usize>,
}

impl FixedSummary {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Summarizer for FixedSummary {
    fn generate_summary(&self, _content: &str, _max_length: usize) -> Option<String> {
        *self.calls.lock().unwrap() += 1;
        Some(self.summary.clone())
    }
}

/// Behaves like a summarizer whose every request failed.
pub struct FailingSummary;

impl Summarizer for FailingSummary {
    fn generate_summary(&self, _content: &str, _max_length: usize) -> Option<String> {
        None
    }
}

// =========================================================================
// Stores
// =========================================================================

/// Loads empty and refuses every write.
#[derive(Default)]
pub struct FailingStore {
    attempts: Mutex<usize>,
}

impl FailingStore {
    /// Number of `save_all` calls made so far.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl KeyValueStore for FailingStore {
    fn load_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(BTreeMap::new())
    }

    fn save_all(&self, _entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        *self.attempts.lock().unwrap() += 1;
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only store",
        )))
    }
}

// =========================================================================
// Workspace fixture
// =========================================================================

/// A temp directory laid out like a real setup:
///
/// ```text
/// <tmp>/vault/                  notes
/// <tmp>/site/_posts/            published posts
/// <tmp>/site/_posts/Uncategorized/  new posts
/// ```
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("vault")).unwrap();
        fs::create_dir_all(tmp.path().join("site/_posts")).unwrap();
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn vault(&self) -> PathBuf {
        self.root().join("vault")
    }

    pub fn posts(&self) -> PathBuf {
        self.root().join("site/_posts")
    }

    pub fn output(&self) -> PathBuf {
        self.posts().join("Uncategorized")
    }

    /// Write a note under the vault.
    pub fn note(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.vault().join(rel), content)
    }

    /// Write a published post under the posts root.
    pub fn post(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.posts().join(rel), content)
    }

    /// Config pointing every path into this workspace.
    pub fn config(&self) -> Config {
        Config {
            paths: PathsConfig {
                source: self.vault(),
                posts: self.posts(),
                output: None,
                inventory: None,
                hash_record: None,
                decisions: self.root().join("callout_decisions.json"),
            },
            ..Config::default()
        }
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    path.to_path_buf()
}
