//! Change detection for source notes.
//!
//! A full sync re-reads every source note that has a published counterpart.
//! Most of them have not changed since the last run, so each file's content
//! digest is recorded and compared next time; a match skips the file.
//!
//! The record is a filter only. It never decides identity (that is the
//! inventory's job) and a hit counts as success, not as a skip.
//!
//! ## Digests
//!
//! SHA-256 of the raw file bytes, hex encoded. Content-based rather than
//! mtime-based so it survives syncing tools that touch modification times.
//!
//! ## Persistence
//!
//! Loaded once at batch start through a [`KeyValueStore`] and written back
//! whole at the end of the batch, whatever the per-file outcomes were. Files
//! that failed are never re-recorded, so they keep their previous digest (or
//! none) and get retried next run.

use crate::store::{KeyValueStore, StoreError};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Header title of the on-disk record.
pub const RECORD_TITLE: &str = "File hash record";

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 hash of `bytes`, hex encoded.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Key a source file is recorded under.
pub fn record_key(path: &Path) -> String {
    path.display().to_string()
}

/// Source path → last-known digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashRecord {
    entries: BTreeMap<String, String>,
}

impl HashRecord {
    /// Load from `store`. An unreadable record starts empty, which only costs
    /// a full re-conversion.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.load_all() {
            Ok(entries) => Self { entries },
            Err(e) => {
                log::warn!("[hashes] could not load hash record: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.save_all(&self.entries)
    }

    /// Whether `key` was recorded with exactly `digest`.
    pub fn is_unchanged(&self, key: &str, digest: &str) -> bool {
        self.entries.get(key).is_some_and(|known| known == digest)
    }

    pub fn record(&mut self, key: impl Into<String>, digest: impl Into<String>) {
        self.entries.insert(key.into(), digest.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
