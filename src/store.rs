//! Persisted key-value maps.
//!
//! Two maps outlive a run: the callout decisions and the source hash record.
//! Both are read fully at batch start and written fully back, so the only
//! contract the rest of the crate needs is [`KeyValueStore`]: `load_all` and
//! `save_all`. Transform and reconciliation code never touches the files
//! directly, and tests swap in [`MemoryStore`].
//!
//! Storage formats:
//!
//! | Store            | Format                                         |
//! |------------------|------------------------------------------------|
//! | [`JsonFileStore`] | pretty-printed JSON object, string → string   |
//! | [`LineFileStore`] | `# header` line, blank line, `key: value` lines |
//!
//! A missing file loads as an empty map.

use chrono::{Local, Timelike};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load-all / save-all persistence for a string map.
pub trait KeyValueStore {
    fn load_all(&self) -> Result<BTreeMap<String, String>, StoreError>;
    fn save_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError>;
}

/// A JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn load_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        ensure_parent(&self.path)?;
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Line-oriented `key: value` file with a timestamped header comment.
///
/// Keys may themselves contain `:` (Windows drive letters), so each line is
/// split at its **last** colon. Comment lines, blank lines and lines without
/// a usable key and value are ignored on load.
#[derive(Debug, Clone)]
pub struct LineFileStore {
    path: PathBuf,
    title: String,
}

impl LineFileStore {
    /// `title` is written into the header comment.
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for LineFileStore {
    fn load_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(parse_lines(&content))
    }

    fn save_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        ensure_parent(&self.path)?;
        let mut out = format!("# {} - updated {}\n\n", self.title, header_timestamp());
        for (key, value) in entries {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        fs::write(&self.path, out)?;
        Ok(())
    }
}

fn parse_lines(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.rsplit_once(':')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Local time as `YYYY-MM-DD HH:MM:SS`, seconds never above 59.
pub(crate) fn header_timestamp() -> String {
    let now = Local::now();
    // A leap second carries nanoseconds past 1e9 and would print as `:60`.
    let now = now
        .with_nanosecond(now.nanosecond() % 1_000_000_000)
        .unwrap_or(now);
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// In-memory store. Counts saves so callers can assert on persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: Mutex::new(entries),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| *s).unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.snapshot())
    }

    fn save_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Ok(mut stored) = self.entries.lock() {
            *stored = entries.clone();
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("notes/a.md:note".to_string(), "info".to_string()),
            ("notes/b.md:todo".to_string(), "drop".to_string()),
        ])
    }

    #[test]
    fn json_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("decisions.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn json_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("nested/decisions.json"));
        store.save_all(&sample()).unwrap();
        assert_eq!(store.load_all().unwrap(), sample());
    }

    #[test]
    fn json_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("decisions.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load_all(), Err(StoreError::Json(_))));
    }

    #[test]
    fn line_file_has_header_and_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.txt");
        let store = LineFileStore::new(&path, "File hash record");
        store
            .save_all(&BTreeMap::from([("vault/a.md".to_string(), "abc123".to_string())]))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("# File hash record - updated "));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("vault/a.md: abc123"));
    }

    #[test]
    fn line_file_ignores_comments_and_malformed_lines() {
        let parsed = parse_lines(
            "# header: with colon\n\nvault/a.md: abc\nno separator here\n: orphan\nkey:\n  vault/b.md :  def  \n",
        );
        assert_eq!(
            parsed,
            BTreeMap::from([
                ("vault/a.md".to_string(), "abc".to_string()),
                ("vault/b.md".to_string(), "def".to_string()),
            ])
        );
    }

    #[test]
    fn line_file_keeps_drive_letters_in_keys() {
        let parsed = parse_lines("C:\\vault\\a.md: abc\n");
        assert_eq!(parsed.get("C:\\vault\\a.md").map(String::as_str), Some("abc"));
    }

    #[test]
    fn line_file_missing_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LineFileStore::new(tmp.path().join("none.txt"), "x");
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::new();
        store.save_all(&sample()).unwrap();
        store.save_all(&sample()).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load_all().unwrap(), sample());
    }
}
