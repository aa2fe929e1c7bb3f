//! Wiki-link conversion.
//!
//! Obsidian internal links have no target on the published blog, so they are
//! rendered as emphasized text:
//!
//! - `[[target|label]]` → `*label*`
//! - `[[target]]` → `*target*` (including `target#anchor`)
//!
//! The aliased form must be rewritten first: the bare pattern would otherwise
//! swallow the `|` separator into the emphasized text.

use regex::Regex;
use std::sync::LazyLock;

static ALIASED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^|\]]+)\|([^\]]+)\]\]").unwrap());
static BARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());

/// Rewrite every wiki link in `text` as emphasized text.
pub fn convert_wiki_links(text: &str) -> String {
    let text = ALIASED_RE.replace_all(text, "*${2}*");
    BARE_RE.replace_all(&text, "*${1}*").into_owned()
}
