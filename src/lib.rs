//! # obsidian2chirpy
//!
//! Converts notes from an Obsidian vault into posts for a Jekyll site using
//! the Chirpy theme. The vault stays the source of truth: notes are written
//! in Obsidian syntax and every run re-derives the published posts from
//! them.
//!
//! # Architecture: One Note at a Time
//!
//! ```text
//! vault/ ──▶ target resolution ──▶ per note:
//!                                    hash gate (full sync only)
//!                                    pipeline: metadata, callouts, links, math
//!                                    CREATE new post / UPDATE existing post
//!                                  ──▶ _posts/
//! ```
//!
//! A batch is strictly sequential. The only state carried from one note to
//! the next is the inventory of published posts, the hash record and the
//! callout decisions; all three are persisted between runs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`document`] | Metadata block / body split, forgiving field reads |
//! | [`links`] | `[[wiki links]]` → emphasized text |
//! | [`math`] | LaTeX delimiter normalization and `$$` fences |
//! | [`frontmatter`] | Timestamp normalization, metadata block rebuild |
//! | [`callout`] | Obsidian callouts → Chirpy prompt blocks |
//! | [`pipeline`] | Fixed-order document assembly |
//! | [`naming`] | `YYYY-MM-DD-` post filename convention |
//! | [`inventory`] | Title index over published posts, inventory report |
//! | [`reconcile`] | CREATE vs UPDATE, `final_version` lock |
//! | [`hashes`] | Content digests for change detection |
//! | [`store`] | Key-value persistence behind a trait |
//! | [`decision`] | Interactive (or not) answers to callout and search questions |
//! | [`summary`] | Summary collaborator and its chat-completion client |
//! | [`summarize`] | Description backfill for published posts |
//! | [`search`] | `convert` target resolution and name search |
//! | [`batch`] | The `convert` batch driver |
//! | [`config`] | `obsidian2chirpy.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Collaborators Behind Traits
//!
//! Everything that talks to the outside world during a conversion sits
//! behind a trait: persistence ([`store::KeyValueStore`]), user decisions
//! ([`decision::DecisionProvider`]) and summaries
//! ([`summary::Summarizer`]). The transforms themselves are plain functions
//! from text to text, so the whole pipeline runs in tests with scripted
//! answers and in-memory stores.
//!
//! ## Failures Degrade, Batches Continue
//!
//! A summary request that fails simply leaves the description out. A note
//! that cannot be read is logged and counted, and the batch moves on to the
//! next one.
//!
//! ## Idempotent Output
//!
//! Running the pipeline over its own output changes nothing, so a post can
//! be regenerated any number of times without drifting.

pub mod batch;
pub mod callout;
pub mod config;
pub mod decision;
pub mod document;
pub mod frontmatter;
pub mod hashes;
pub mod inventory;
pub mod links;
pub mod math;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod search;
pub mod store;
pub mod summarize;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_helpers;
