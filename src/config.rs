//! Tool configuration.
//!
//! Loaded from `obsidian2chirpy.toml` in the working directory (or the file
//! given with `--config`). Every key is optional; a missing file means stock
//! defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! default_title = "Untitled"   # Title used when a note has no file name
//!
//! [paths]
//! source = "vault"             # Obsidian vault to read notes from
//! posts = "_posts"             # Root of the published posts
//! output = "_posts/Uncategorized"  # Where new posts are created
//! inventory = "md_files_inventory.txt"  # Defaults next to the posts root
//! hash_record = "file_hash_record.txt"  # Defaults next to the posts root
//! decisions = "callout_decisions.json"
//!
//! [summary]
//! enabled = false              # Generate a description for new posts
//! max_length = 100             # Target summary length in characters
//! api_url = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
//! model = "qwen-max-latest"
//! api_key_env = "DASHSCOPE_API_KEY"
//! request_interval_ms = 1000   # Pause between backfill requests
//! disclaimer = "<--- AI-generated summary, may be inaccurate --->"
//!
//! [callouts]                   # Extra or overriding type -> class entries
//! note = "info"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "obsidian2chirpy.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Title used when no file name is known.
    pub default_title: String,
    /// Input, output and bookkeeping file locations.
    pub paths: PathsConfig,
    /// Description generation.
    pub summary: SummaryConfig,
    /// Callout type → prompt class entries layered over the built-in table.
    pub callouts: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_title: "Untitled".to_string(),
            paths: PathsConfig::default(),
            summary: SummaryConfig::default(),
            callouts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.summary.max_length == 0 {
            return Err(ConfigError::Validation(
                "summary.max_length must be greater than 0".into(),
            ));
        }
        if let Some((kind, _)) = self.callouts.iter().find(|(_, class)| class.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "callouts.{kind} must name a prompt class"
            )));
        }
        if self.default_title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_title must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// The Obsidian vault.
    pub source: PathBuf,
    /// Root of the published posts tree.
    pub posts: PathBuf,
    /// Directory for newly created posts. Defaults to `<posts>/Uncategorized`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Inventory report. Defaults to `md_files_inventory.txt` next to `posts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
    /// Hash record. Defaults to `file_hash_record.txt` next to `posts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_record: Option<PathBuf>,
    /// Persisted callout decisions.
    pub decisions: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("vault"),
            posts: PathBuf::from("_posts"),
            output: None,
            inventory: None,
            hash_record: None,
            decisions: PathBuf::from("callout_decisions.json"),
        }
    }
}

impl PathsConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.posts.join("Uncategorized"))
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.inventory
            .clone()
            .unwrap_or_else(|| self.beside_posts("md_files_inventory.txt"))
    }

    pub fn hash_record_path(&self) -> PathBuf {
        self.hash_record
            .clone()
            .unwrap_or_else(|| self.beside_posts("file_hash_record.txt"))
    }

    /// A file in the directory that contains the posts root.
    fn beside_posts(&self, name: &str) -> PathBuf {
        self.posts
            .parent()
            .map(|p| p.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

/// Description generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Generate a description when a new post is created.
    pub enabled: bool,
    /// Target summary length in characters.
    pub max_length: usize,
    /// OpenAI-compatible chat-completion endpoint.
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    /// Pause between requests when backfilling many posts.
    pub request_interval_ms: u64,
    /// Appended to every generated summary.
    pub disclaimer: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_length: 100,
            api_url: "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
                .to_string(),
            model: "qwen-max-latest".to_string(),
            api_key_env: "DASHSCOPE_API_KEY".to_string(),
            request_interval_ms: 1000,
            disclaimer: "<--- AI-generated summary, may be inaccurate --->".to_string(),
        }
    }
}

/// Load and validate the config file at `path`.
///
/// Returns stock defaults when the file does not exist. Returns `Err` if the
/// file exists but is invalid TOML, has unknown keys, or fails validation.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# obsidian2chirpy configuration
# =============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Title used when a note has no file name to take it from.
default_title = "Untitled"

[paths]
# Obsidian vault the notes are read from.
source = "vault"
# Root of the published posts (searched recursively).
posts = "_posts"
# Where newly created posts are written. Defaults to <posts>/Uncategorized.
# output = "_posts/Uncategorized"
# Generated inventory report. Defaults to a file next to the posts root.
# inventory = "md_files_inventory.txt"
# Source-file hash record. Defaults to a file next to the posts root.
# hash_record = "file_hash_record.txt"
# Remembered answers for unknown callout types.
decisions = "callout_decisions.json"

[summary]
# Generate a `description` when a new post is created.
enabled = false
# Target summary length in characters.
max_length = 100
# OpenAI-compatible chat-completion endpoint and model.
api_url = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
model = "qwen-max-latest"
# Environment variable holding the API key.
api_key_env = "DASHSCOPE_API_KEY"
# Pause between requests in `summarize`, in milliseconds.
request_interval_ms = 1000
# Appended to every generated summary.
disclaimer = "<--- AI-generated summary, may be inaccurate --->"

# Callout types mapped to Chirpy prompt classes, on top of the built-in
# table (info, tip, warning, danger, quote, question -> tip,
# caution -> warning). Unknown types are asked about interactively.
[callouts]
# note = "info"
# example = "tip"
"##
}
