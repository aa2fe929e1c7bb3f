//! Summary generation for the `description` field.
//!
//! The pipeline only sees the [`Summarizer`] trait: give it content and a
//! target length, get back a summary or nothing. Failure is never an error at
//! this boundary. A missing API key, a transport failure, a non-200 response
//! and a malformed body all come back as `None` and the caller simply skips
//! the description.
//!
//! The production implementation, [`ChatSummarizer`], talks to any
//! OpenAI-compatible chat-completion endpoint.

use crate::config::SummaryConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Only this many characters of content are sent with a request.
const MAX_PROMPT_CHARS: usize = 4000;

/// Summaries longer than `max_length + SLACK` characters get truncated.
const SLACK: usize = 50;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("API key not set (expected in ${0})")]
    MissingKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Summary request failed with status {0}: {1}")]
    Status(u16, String),
    #[error("Response contained no summary")]
    EmptyResponse,
}

/// Produces a short summary of a post.
pub trait Summarizer {
    /// Summarize `content` in roughly `max_length` characters.
    /// `None` means "no summary", for whatever reason.
    fn generate_summary(&self, content: &str, max_length: usize) -> Option<String>;
}

/// Summarizer that never produces anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSummary;

impl Summarizer for NoSummary {
    fn generate_summary(&self, _content: &str, _max_length: usize) -> Option<String> {
        None
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completion backed summarizer.
pub struct ChatSummarizer {
    client: reqwest::blocking::Client,
    api_url: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
    disclaimer: String,
}

impl ChatSummarizer {
    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(config: &SummaryConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
            disclaimer: config.disclaimer.clone(),
        }
    }

    /// Whether a key is available; without one every request is skipped.
    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request(&self, content: &str, max_length: usize) -> Result<String, SummaryError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummaryError::MissingKey(self.api_key_env.clone()))?;

        let excerpt: String = content.chars().take(MAX_PROMPT_CHARS).collect();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: "You write short, plain summaries of blog posts. \
                              Summaries state the main content clearly and concisely."
                        .into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!(
                        "Summarize the following post in about {max_length} characters. \
                         Do not open with phrases like \"This article\" or \"This post\". \
                         Answer in the language of the post.\n\n{excerpt}"
                    ),
                },
            ],
            max_tokens: 100,
            temperature: 0.5,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(SummaryError::Status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SummaryError::EmptyResponse)
    }
}

impl Summarizer for ChatSummarizer {
    fn generate_summary(&self, content: &str, max_length: usize) -> Option<String> {
        match self.request(content, max_length) {
            Ok(summary) => Some(finish_summary(&summary, &self.disclaimer, max_length)),
            Err(e) => {
                log::warn!("[summary] {e}");
                None
            }
        }
    }
}

/// Append the disclaimer and cut overly long results.
pub fn finish_summary(summary: &str, disclaimer: &str, max_length: usize) -> String {
    let mut full = summary.trim().to_string();
    if !disclaimer.is_empty() {
        full.push_str("\n ");
        full.push_str(disclaimer);
    }
    if full.chars().count() > max_length + SLACK {
        let cut: String = full.chars().take(max_length.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        full
    }
}

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").unwrap());

/// Reduce markdown to the prose worth summarizing: code blocks, HTML tags
/// and images removed, links reduced to their text.
pub fn prepare_content(body: &str) -> String {
    let text = CODE_FENCE_RE.replace_all(body, "");
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = IMAGE_RE.replace_all(&text, "");
    LINK_RE.replace_all(&text, "${1}").into_owned()
}
