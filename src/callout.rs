//! Callout conversion.
//!
//! Obsidian callouts are block quotes whose first line carries a type tag.
//! Chirpy expresses the same thing as a plain block quote followed by a
//! prompt-class annotation:
//!
//! ```text
//! > [!tip]- Title             > Title
//! > first line        ──▶     >
//! > second line               > first line
//!                             > second line
//!                             {: .prompt-tip}
//! ```
//!
//! Detection is line based. A callout starts on a quote line whose first
//! content is a bracketed tag (`[!type]`, the `!` optional); everything after
//! the `]` is the title, minus an Obsidian fold marker (`-`/`+`). A `|hint`
//! suffix on the tag is ignored and the tag is case-folded. The block runs
//! over the following quote lines until a non-quote line or the next callout
//! start. Exactly one `>` is stripped from each body line, so nested quotes
//! survive. `[text](url)` is a link, not a callout.
//!
//! Known tags map through [`CalloutTable`]. Unknown tags are resolved once:
//! a decision recorded for this file wins, then one made earlier in the run,
//! then the [`DecisionProvider`] is asked and the answer persisted.

use crate::decision::{CalloutDecision, DecisionProvider};
use crate::store::KeyValueStore;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Built-in type → prompt class table.
pub const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("info", "info"),
    ("tip", "tip"),
    ("warning", "warning"),
    ("danger", "danger"),
    ("quote", "quote"),
    ("question", "tip"),
    ("caution", "warning"),
];

static START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*\[\s*!?\s*([^\]]+)\](.*)$").unwrap());

/// Callout type to prompt class mapping.
#[derive(Debug, Clone)]
pub struct CalloutTable {
    classes: BTreeMap<String, String>,
}

impl Default for CalloutTable {
    fn default() -> Self {
        Self {
            classes: BUILTIN_TYPES
                .iter()
                .map(|(kind, class)| (kind.to_string(), class.to_string()))
                .collect(),
        }
    }
}

impl CalloutTable {
    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (kind, class) in overrides {
            table
                .classes
                .insert(kind.trim().to_lowercase(), class.trim().to_string());
        }
        table
    }

    pub fn class_for(&self, kind: &str) -> Option<&str> {
        self.classes.get(kind).map(String::as_str)
    }
}

/// First line of a callout.
#[derive(Debug, PartialEq, Eq)]
struct Start<'a> {
    kind: String,
    title: &'a str,
}

fn parse_start(line: &str) -> Option<Start<'_>> {
    let caps = START_RE.captures(line)?;
    let rest = caps.get(2).map_or("", |m| m.as_str());
    if rest.starts_with('(') {
        return None;
    }
    let tag = caps.get(1).map_or("", |m| m.as_str());
    let kind = tag.split('|').next().unwrap_or("").trim().to_lowercase();
    if kind.is_empty() {
        return None;
    }
    let title = rest
        .strip_prefix(['-', '+'])
        .unwrap_or(rest)
        .trim();
    Some(Start { kind, title })
}

/// Whether `line` opens a callout.
pub fn is_callout_start(line: &str) -> bool {
    parse_start(line).is_some()
}

fn is_quote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Rebuild `text` line by line, keeping a trailing newline if it had one.
fn rejoin(lines: &[&str], original: &str) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Insert a blank line before every callout start that does not already
/// follow one. Whitespace-only lines count as blank; a callout on the very
/// first line is left alone.
pub fn ensure_blank_lines_before_callouts(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if is_callout_start(line) && lines.last().is_some_and(|prev| !is_blank(prev)) {
            lines.push("");
        }
        lines.push(line);
    }
    rejoin(&lines, text)
}

/// Insert a blank line between a quote line and a callout start directly
/// below it, so two adjacent callouts stay separate blocks.
pub fn separate_adjacent_callouts(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if is_callout_start(line) && lines.last().is_some_and(|prev| is_quote_line(prev)) {
            lines.push("");
        }
        lines.push(line);
    }
    rejoin(&lines, text)
}

/// Converts callouts, resolving unknown types through a decision provider and
/// remembering the answers.
pub struct CalloutConverter<'a> {
    table: CalloutTable,
    store: &'a dyn KeyValueStore,
    /// `"{file}:{type}"` → decision code, mirrored to `store`.
    persisted: BTreeMap<String, String>,
    /// Decisions made during this run, by type.
    session: HashMap<String, CalloutDecision>,
}

impl<'a> CalloutConverter<'a> {
    /// Loads the persisted decisions once. An unreadable store starts empty.
    pub fn new(table: CalloutTable, store: &'a dyn KeyValueStore) -> Self {
        let persisted = store.load_all().unwrap_or_else(|e| {
            log::warn!("[callout] could not load decisions: {e}");
            BTreeMap::new()
        });
        Self {
            table,
            store,
            persisted,
            session: HashMap::new(),
        }
    }

    /// Convert every callout in `text`.
    ///
    /// `file` identifies the document for file-specific decisions; without it
    /// only the session map applies.
    pub fn convert(
        &mut self,
        text: &str,
        file: Option<&str>,
        provider: &mut dyn DecisionProvider,
    ) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            let Some(start) = parse_start(lines[i]) else {
                out.push(lines[i].to_string());
                i += 1;
                continue;
            };

            let mut body = Vec::new();
            i += 1;
            while i < lines.len() && is_quote_line(lines[i]) && !is_callout_start(lines[i]) {
                body.push(strip_one_marker(lines[i]));
                i += 1;
            }

            let class = match self.table.class_for(&start.kind) {
                Some(class) => class.to_string(),
                None => match self.resolve(&start.kind, start.title, file, provider) {
                    CalloutDecision::Info => "info".to_string(),
                    CalloutDecision::Quote => "quote".to_string(),
                    CalloutDecision::Drop => continue,
                },
            };
            render(&mut out, start.title, &body, &class);
        }

        let mut result = out.join("\n");
        if text.ends_with('\n') && !result.is_empty() {
            result.push('\n');
        }
        result
    }

    fn resolve(
        &mut self,
        kind: &str,
        sample: &str,
        file: Option<&str>,
        provider: &mut dyn DecisionProvider,
    ) -> CalloutDecision {
        let file_key = file.map(|f| format!("{f}:{kind}"));
        if let Some(decision) = file_key
            .as_ref()
            .and_then(|key| self.persisted.get(key))
            .and_then(|code| CalloutDecision::from_code(code))
        {
            return decision;
        }
        if let Some(&decision) = self.session.get(kind) {
            return decision;
        }

        let decision = provider.resolve_callout(kind, sample);
        self.session.insert(kind.to_string(), decision);
        if let Some(key) = file_key {
            self.persisted.insert(key, decision.code().to_string());
            if let Err(e) = self.store.save_all(&self.persisted) {
                log::warn!("[callout] could not save decisions: {e}");
            }
        }
        decision
    }
}

/// Body line with its leading whitespace and one `>` removed.
fn strip_one_marker(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix('>').unwrap_or(line).trim_start()
}

fn render(out: &mut Vec<String>, title: &str, body: &[&str], class: &str) {
    if !title.is_empty() {
        out.push(format!("> {title}"));
        out.push(">".to_string());
    } else if body.is_empty() {
        out.push(">".to_string());
    }
    for line in body {
        if line.is_empty() {
            out.push(">".to_string());
        } else {
            out.push(format!("> {line}"));
        }
    }
    out.push(format!("{{: .prompt-{class}}}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_helpers::{FailingStore, ScriptedDecisions};

    fn convert_with(
        text: &str,
        store: &MemoryStore,
        decisions: &mut ScriptedDecisions,
    ) -> String {
        CalloutConverter::new(CalloutTable::default(), store).convert(text, Some("a.md"), decisions)
    }

    // =========================================================================
    // Detection
    // =========================================================================

    #[test]
    fn parses_type_title_and_fold_marker() {
        let start = parse_start("> [!Tip|wide]- Remember this").unwrap();
        assert_eq!(start.kind, "tip");
        assert_eq!(start.title, "Remember this");
    }

    #[test]
    fn bang_and_spacing_are_optional() {
        assert!(is_callout_start(">[ ! warning ] x"));
        assert!(is_callout_start("  > [note]"));
    }

    #[test]
    fn link_in_quote_is_not_a_callout() {
        assert!(!is_callout_start("> [docs](https://example.com) say so"));
        assert!(!is_callout_start("plain [!tip] text"));
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    #[test]
    fn known_type_with_title() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with(
            "Before\n\n> [!tip] Title\n> line one\n> line two\n\nAfter\n",
            &store,
            &mut decisions,
        );
        assert_eq!(
            out,
            "Before\n\n> Title\n>\n> line one\n> line two\n{: .prompt-tip}\n\nAfter\n"
        );
    }

    #[test]
    fn known_type_without_title_has_no_separator() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with("> [!warning]\n> careful\n", &store, &mut decisions);
        assert_eq!(out, "> careful\n{: .prompt-warning}\n");
    }

    #[test]
    fn mapped_aliases() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with("> [!question] Why\n> because\n", &store, &mut decisions);
        assert!(out.ends_with("{: .prompt-tip}\n"));
        let out = convert_with("> [!CAUTION]\n> hot\n", &store, &mut decisions);
        assert!(out.ends_with("{: .prompt-warning}\n"));
    }

    #[test]
    fn known_types_never_ask() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let mut converter = CalloutConverter::new(CalloutTable::default(), &store);
        for (kind, _) in BUILTIN_TYPES {
            converter.convert(&format!("> [!{kind}] t\n> body\n"), Some("a.md"), &mut decisions);
        }
        assert!(decisions.asked().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn nested_quote_keeps_inner_marker() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with("> [!info]\n> > inner\n>\n> after\n", &store, &mut decisions);
        assert_eq!(out, "> > inner\n>\n> after\n{: .prompt-info}\n");
    }

    #[test]
    fn next_callout_ends_the_block() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with("> [!tip] A\n> a\n> [!danger] B\n> b\n", &store, &mut decisions);
        assert_eq!(
            out,
            "> A\n>\n> a\n{: .prompt-tip}\n> B\n>\n> b\n{: .prompt-danger}\n"
        );
    }

    #[test]
    fn config_override_maps_new_type() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[]);
        let table = CalloutTable::with_overrides(&BTreeMap::from([(
            "Note".to_string(),
            "info".to_string(),
        )]));
        let out = CalloutConverter::new(table, &store).convert("> [!note]\n> x\n", None, &mut decisions);
        assert_eq!(out, "> x\n{: .prompt-info}\n");
        assert!(decisions.asked().is_empty());
    }

    // =========================================================================
    // Unknown types
    // =========================================================================

    #[test]
    fn unknown_type_asks_and_persists() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Quote]);
        let out = convert_with("> [!todo] Later\n> stuff\n", &store, &mut decisions);
        assert_eq!(out, "> Later\n>\n> stuff\n{: .prompt-quote}\n");
        assert_eq!(decisions.asked(), vec!["todo".to_string()]);
        assert_eq!(store.snapshot().get("a.md:todo").map(String::as_str), Some("Q"));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn failed_decision_save_does_not_stop_conversion() {
        let store = FailingStore::default();
        let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Quote]);
        let mut converter = CalloutConverter::new(CalloutTable::default(), &store);

        let out = converter.convert(
            "> [!todo] One\n> a\n\n> [!todo] Two\n> b\n",
            Some("a.md"),
            &mut decisions,
        );
        assert_eq!(
            out,
            "> One\n>\n> a\n{: .prompt-quote}\n\n> Two\n>\n> b\n{: .prompt-quote}\n"
        );
        assert_eq!(decisions.asked(), vec!["todo".to_string()]);
        assert_eq!(store.attempts(), 1);
    }

    #[test]
    fn drop_removes_block() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Drop]);
        let out = convert_with("Keep\n> [!todo] x\n> gone\nTail\n", &store, &mut decisions);
        assert_eq!(out, "Keep\nTail\n");
    }

    #[test]
    fn session_decision_reused_within_run() {
        let store = MemoryStore::new();
        let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Info]);
        let mut converter = CalloutConverter::new(CalloutTable::default(), &store);
        converter.convert("> [!todo] a\n> x\n", Some("a.md"), &mut decisions);
        let out = converter.convert("> [!todo] b\n> y\n", Some("b.md"), &mut decisions);
        assert!(out.ends_with("{: .prompt-info}\n"));
        assert_eq!(decisions.asked().len(), 1);
    }

    #[test]
    fn file_decision_beats_session_decision() {
        let store = MemoryStore::with_entries(BTreeMap::from([(
            "b.md:todo".to_string(),
            "N".to_string(),
        )]));
        let mut decisions = ScriptedDecisions::new(&[CalloutDecision::Info]);
        let mut converter = CalloutConverter::new(CalloutTable::default(), &store);
        converter.convert("> [!todo]\n> x\n", Some("a.md"), &mut decisions);
        let out = converter.convert("> [!todo]\n> y\nrest\n", Some("b.md"), &mut decisions);
        assert_eq!(out, "rest\n");
    }

    #[test]
    fn persisted_decision_skips_prompt() {
        let store = MemoryStore::with_entries(BTreeMap::from([(
            "a.md:todo".to_string(),
            "Q".to_string(),
        )]));
        let mut decisions = ScriptedDecisions::new(&[]);
        let out = convert_with("> [!todo]\n> x\n", &store, &mut decisions);
        assert!(out.ends_with("{: .prompt-quote}\n"));
        assert!(decisions.asked().is_empty());
    }

    // =========================================================================
    // Post-passes
    // =========================================================================

    #[test]
    fn blank_line_inserted_before_callout() {
        assert_eq!(
            ensure_blank_lines_before_callouts("Text\n> [!tip] x\n> y\n"),
            "Text\n\n> [!tip] x\n> y\n"
        );
    }

    #[test]
    fn whitespace_only_line_counts_as_blank() {
        let text = "Text\n   \n> [!tip] x\n";
        assert_eq!(ensure_blank_lines_before_callouts(text), text);
    }

    #[test]
    fn callout_on_first_line_untouched() {
        let text = "> [!tip] x\n> y";
        assert_eq!(ensure_blank_lines_before_callouts(text), text);
    }

    #[test]
    fn adjacent_callouts_gain_exactly_one_line() {
        let text = "> [!tip] A\n> a\n> [!info] B\n> b\n";
        let out = separate_adjacent_callouts(text);
        assert_eq!(out.lines().count(), text.lines().count() + 1);
        assert_eq!(out, "> [!tip] A\n> a\n\n> [!info] B\n> b\n");
    }

    #[test]
    fn both_passes_together_add_one_line() {
        let text = "> [!tip] A\n> a\n> [!info] B\n> b\n";
        let out = separate_adjacent_callouts(&ensure_blank_lines_before_callouts(text));
        assert_eq!(out.lines().count(), text.lines().count() + 1);
    }

    #[test]
    fn separated_callouts_are_stable() {
        let text = "> [!tip] A\n> a\n\n> [!info] B\n";
        assert_eq!(separate_adjacent_callouts(text), text);
    }
}
