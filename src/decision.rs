//! Decision providers.
//!
//! Two questions need a human answer: what to do with a callout type the
//! mapping table does not know, and which of several search matches to
//! convert. Both go through [`DecisionProvider`], so the pipeline never
//! assumes a console is attached.
//!
//! - [`ConsolePrompt`] asks on a reader/writer pair (stdin/stdout in the
//!   binary).
//! - [`AlwaysDefault`] answers without asking: unknown callouts become info
//!   blocks, ambiguous searches quit.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Resolution for an unknown callout type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalloutDecision {
    /// Convert as an info prompt.
    #[default]
    Info,
    /// Convert as a quote prompt.
    Quote,
    /// Remove the callout entirely.
    Drop,
}

impl CalloutDecision {
    /// Single-letter code used in prompts and in the decision store.
    pub fn code(self) -> &'static str {
        match self {
            Self::Info => "I",
            Self::Quote => "Q",
            Self::Drop => "N",
        }
    }

    /// Parse a stored code or a typed answer. Empty input means `Info`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "" | "I" => Some(Self::Info),
            "Q" => Some(Self::Quote),
            "N" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// Which search match to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChoice {
    Folder(usize),
    File(usize),
    Quit,
}

pub trait DecisionProvider {
    /// Decide what to do with callout type `kind`. `sample` is the title text
    /// of the block, shown for context.
    fn resolve_callout(&mut self, kind: &str, sample: &str) -> CalloutDecision;

    /// Pick one of the folders or files matching `query`.
    fn choose_target(&mut self, query: &str, folders: &[PathBuf], files: &[PathBuf])
    -> TargetChoice;
}

/// Never asks. Unknown callouts become info blocks; ambiguous searches quit.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysDefault;

impl DecisionProvider for AlwaysDefault {
    fn resolve_callout(&mut self, kind: &str, _sample: &str) -> CalloutDecision {
        log::info!("[callout] unknown type [{kind}] treated as info");
        CalloutDecision::default()
    }

    fn choose_target(
        &mut self,
        query: &str,
        folders: &[PathBuf],
        files: &[PathBuf],
    ) -> TargetChoice {
        log::warn!(
            "[search] '{query}' is ambiguous ({} folders, {} files); nothing converted",
            folders.len(),
            files.len()
        );
        TargetChoice::Quit
    }
}

/// Interactive prompt over any line reader and writer.
///
/// End of input (or a read error) takes the default answer, which is `Info`
/// for callouts and `Quit` for search matches.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    fn ask(&mut self, prompt: &str) -> Option<String> {
        // Prompt output is best-effort; the answer still comes from input.
        let _ = write!(self.output, "{prompt}");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn say(&mut self, line: &str) {
        let _ = writeln!(self.output, "{line}");
    }

    fn list(&mut self, label: &str, items: &[PathBuf]) {
        for (i, item) in items.iter().enumerate() {
            self.say(&format!("  {label}{}. {}", i + 1, item.display()));
        }
    }
}

impl<R: BufRead, W: Write> DecisionProvider for ConsolePrompt<R, W> {
    fn resolve_callout(&mut self, kind: &str, sample: &str) -> CalloutDecision {
        self.say("");
        self.say(&format!("Unsupported callout type: [{kind}]"));
        self.say(&format!("Sample: {}", sample.trim()));
        self.say("  I - convert to an info prompt (default)");
        self.say("  Q - convert to a quote prompt");
        self.say("  N - drop this callout");
        loop {
            let Some(answer) = self.ask("Choice (I/Q/N, Enter for I): ") else {
                return CalloutDecision::default();
            };
            match CalloutDecision::from_code(&answer) {
                Some(decision) => return decision,
                None => self.say("Invalid choice, try again."),
            }
        }
    }

    fn choose_target(
        &mut self,
        query: &str,
        folders: &[PathBuf],
        files: &[PathBuf],
    ) -> TargetChoice {
        let both = !folders.is_empty() && !files.is_empty();
        self.say(&format!("Several matches for '{query}':"));
        if both {
            self.say("Folders:");
            self.list("F", folders);
            self.say("Files:");
            self.list("M", files);
        } else if !folders.is_empty() {
            self.list("", folders);
        } else {
            self.list("", files);
        }

        let prompt = if both {
            "Pick F<n> for a folder or M<n> for a file (q to quit): "
        } else {
            "Pick a number (q to quit): "
        };
        loop {
            let Some(answer) = self.ask(prompt) else {
                return TargetChoice::Quit;
            };
            if answer.eq_ignore_ascii_case("q") {
                return TargetChoice::Quit;
            }
            match parse_choice(&answer, folders.len(), files.len()) {
                Some(choice) => return choice,
                None => self.say("Invalid choice, try again."),
            }
        }
    }
}

/// Parse `F2`/`M1` (both kinds listed) or a bare number (one kind listed).
fn parse_choice(answer: &str, folders: usize, files: usize) -> Option<TargetChoice> {
    let pick = |digits: &str, len: usize| {
        digits
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=len).contains(n))
            .map(|n| n - 1)
    };

    if folders > 0 && files > 0 {
        let mut chars = answer.chars();
        let kind = chars.next()?.to_ascii_uppercase();
        let rest = chars.as_str();
        return match kind {
            'F' => pick(rest, folders).map(TargetChoice::Folder),
            'M' => pick(rest, files).map(TargetChoice::File),
            _ => None,
        };
    }
    if folders > 0 {
        pick(answer, folders).map(TargetChoice::Folder)
    } else {
        pick(answer, files).map(TargetChoice::File)
    }
}
