//! The `convert` batch driver.
//!
//! ```text
//! 1. scan posts root ─▶ inventory (+ report file)
//! 2. load hash record, callout decisions
//! 3. resolve target ─▶ Sync | File | Directory | NotFound | Quit
//! 4. per note: [hash gate] ─▶ Publisher ─▶ Created / Updated / Locked
//! 5. save hash record, rewrite inventory report with the new posts
//! ```
//!
//! Strictly one note at a time. A failure on one note is logged, counted and
//! the batch moves on; nothing short of quitting at the search prompt stops
//! a batch. Notes already written stay written.
//!
//! The hash gate applies to a full sync, where most notes are unchanged.
//! Notes converted through an explicit target are always converted, but
//! their digest is recorded too so the next sync can skip them.

use crate::callout::{CalloutConverter, CalloutTable};
use crate::config::Config;
use crate::decision::DecisionProvider;
use crate::frontmatter::DescriptionPolicy;
use crate::hashes::{self, HashRecord, RECORD_TITLE};
use crate::inventory::{self, Inventory};
use crate::naming;
use crate::pipeline::Pipeline;
use crate::reconcile::{Outcome, Publisher};
use crate::search::{self, Target};
use crate::store::{JsonFileStore, LineFileStore};
use crate::summary::Summarizer;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flags of a `convert` run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Generate descriptions for new posts even when disabled in config.
    pub summary: bool,
    /// Regenerate descriptions a note already carries.
    pub override_summary: bool,
}

/// Progress of a batch, one event per step worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    InventoryBuilt { posts: usize, report: PathBuf },
    SyncPlanned { notes: usize },
    Converted { source: PathBuf, outcome: Outcome },
    Unchanged { source: PathBuf },
    Skipped { path: PathBuf },
    Failed { source: PathBuf, error: String },
    NotFound { query: String },
    Quit,
}

/// End-of-batch counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub created: u32,
    pub updated: u32,
    /// Hash hits and final-version posts.
    pub unchanged: u32,
    pub failed: u32,
    /// Non-markdown files inside a target.
    pub skipped: u32,
    pub quit: bool,
}

impl BatchReport {
    /// Notes that produced a write.
    pub fn processed(&self) -> u32 {
        self.created + self.updated
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created(_) => self.created += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Locked(_) => self.unchanged += 1,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed ({} created, {} updated), {} unchanged, {} skipped, {} failed",
            self.processed(),
            self.created,
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed
        )?;
        if self.quit {
            write!(f, " (quit)")?;
        }
        Ok(())
    }
}

/// Run one `convert` batch.
///
/// `target` is the raw user argument (empty for a full sync). Only setup
/// failures (the posts tree or inventory report cannot be written) are
/// returned as errors; per-note failures end up in the report.
pub fn convert(
    config: &Config,
    target: &str,
    options: ConvertOptions,
    summarizer: &dyn Summarizer,
    decisions: &mut dyn DecisionProvider,
    on_event: &mut dyn FnMut(&BatchEvent),
) -> Result<BatchReport, BatchError> {
    let paths = &config.paths;
    let output_dir = paths.output_dir();
    fs::create_dir_all(&output_dir)?;

    let inventory = Inventory::scan(&paths.posts);
    let report_path = paths.inventory_path();
    inventory.write_report(&report_path)?;
    on_event(&BatchEvent::InventoryBuilt {
        posts: inventory.len(),
        report: report_path.clone(),
    });

    let hash_store = LineFileStore::new(paths.hash_record_path(), RECORD_TITLE);
    let mut hashes = HashRecord::load(&hash_store);
    let decision_store = JsonFileStore::new(&paths.decisions);

    let description = (options.summary || config.summary.enabled).then_some(DescriptionPolicy {
        summarizer,
        max_length: config.summary.max_length,
        overwrite: options.override_summary,
    });
    let callouts = CalloutConverter::new(CalloutTable::with_overrides(&config.callouts), &decision_store);
    let pipeline = Pipeline::new(callouts, config.default_title.clone()).with_source_root(&paths.source);
    let mut run = Run {
        publisher: Publisher::new(pipeline, inventory, output_dir, description),
        hashes: &mut hashes,
        report: BatchReport::default(),
        decisions,
        on_event,
    };

    match search::resolve_target(target, &paths.source, run.decisions) {
        Target::Sync => {
            let pairs = inventory::find_source_files(&report_path, &paths.source)?;
            (run.on_event)(&BatchEvent::SyncPlanned { notes: pairs.len() });
            for (source, post) in pairs {
                run.sync_one(&source, &post);
            }
        }
        Target::File(path) => run.convert_path(&path),
        Target::Directory(dir) => {
            for path in inventory::walk_files(&dir) {
                run.convert_path(&path);
            }
        }
        Target::NotFound(query) => (run.on_event)(&BatchEvent::NotFound { query }),
        Target::Quit => {
            run.report.quit = true;
            (run.on_event)(&BatchEvent::Quit);
        }
    }

    if let Err(e) = run.publisher.inventory().write_report(&report_path) {
        log::warn!("[batch] could not rewrite inventory report: {e}");
    }
    let report = run.report;
    if let Err(e) = hashes.save(&hash_store) {
        log::warn!("[batch] could not save hash record: {e}");
    }
    Ok(report)
}

/// State threaded through the notes of one batch.
struct Run<'a, 'r> {
    publisher: Publisher<'a>,
    hashes: &'r mut HashRecord,
    report: BatchReport,
    decisions: &'r mut dyn DecisionProvider,
    on_event: &'r mut dyn FnMut(&BatchEvent),
}

impl Run<'_, '_> {
    /// Full-sync step: skip unchanged notes, update the paired post otherwise.
    fn sync_one(&mut self, source: &Path, post: &Path) {
        let digest = match hashes::hash_file(source) {
            Ok(digest) => digest,
            Err(e) => return self.fail(source, e.to_string()),
        };
        let key = hashes::record_key(source);
        if self.hashes.is_unchanged(&key, &digest) {
            self.report.unchanged += 1;
            (self.on_event)(&BatchEvent::Unchanged {
                source: source.to_path_buf(),
            });
            return;
        }
        match self.publisher.update_post(source, post, self.decisions) {
            Ok(outcome) => {
                self.hashes.record(key, digest);
                self.converted(source, outcome);
            }
            Err(e) => self.fail(source, e.to_string()),
        }
    }

    /// Explicit-target step: markdown goes through the publisher, anything
    /// else is skipped.
    fn convert_path(&mut self, path: &Path) {
        if !naming::is_markdown(path) {
            self.report.skipped += 1;
            (self.on_event)(&BatchEvent::Skipped {
                path: path.to_path_buf(),
            });
            return;
        }
        match self.publisher.publish(path, self.decisions) {
            Ok(outcome) => {
                if let Ok(digest) = hashes::hash_file(path) {
                    self.hashes.record(hashes::record_key(path), digest);
                }
                self.converted(path, outcome);
            }
            Err(e) => self.fail(path, e.to_string()),
        }
    }

    fn converted(&mut self, source: &Path, outcome: Outcome) {
        self.report.record(&outcome);
        (self.on_event)(&BatchEvent::Converted {
            source: source.to_path_buf(),
            outcome,
        });
    }

    fn fail(&mut self, source: &Path, error: String) {
        log::warn!("[batch] {}: {error}", source.display());
        self.report.failed += 1;
        (self.on_event)(&BatchEvent::Failed {
            source: source.to_path_buf(),
            error,
        });
    }
}
