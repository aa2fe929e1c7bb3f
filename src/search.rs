//! Turning the user's `convert` argument into something to convert.
//!
//! | Input                     | Target                                  |
//! |---------------------------|-----------------------------------------|
//! | empty                     | [`Target::Sync`]: every paired note      |
//! | existing file             | [`Target::File`]                         |
//! | existing directory        | [`Target::Directory`]                    |
//! | anything else             | name search under the vault              |
//!
//! The name search is a case-insensitive substring match against folder
//! names and markdown file names. A single hit is used directly; several are
//! put to the [`DecisionProvider`], which may also quit.

use crate::decision::{DecisionProvider, TargetChoice};
use crate::inventory;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a `convert` run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Re-convert every vault note that has a published post.
    Sync,
    File(PathBuf),
    Directory(PathBuf),
    /// The name search found nothing.
    NotFound(String),
    /// The user quit while choosing between matches.
    Quit,
}

/// Folders and markdown files whose names contain the query.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Matches {
    pub folders: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Case-insensitive substring search under `source_root`.
pub fn search(query: &str, source_root: &Path) -> Matches {
    let needle = query.to_lowercase();
    let name_matches = |path: &Path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase().contains(&needle))
    };

    let folders = if source_root.is_dir() {
        WalkDir::new(source_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .filter(|p| name_matches(p))
            .collect()
    } else {
        Vec::new()
    };

    let files = inventory::markdown_files(source_root)
        .into_iter()
        .filter(|p| name_matches(p))
        .collect();

    Matches { folders, files }
}

/// Resolve the raw `convert` argument.
///
/// Surrounding quotes (as left by drag-and-drop into a terminal) are removed
/// first.
pub fn resolve_target(
    input: &str,
    source_root: &Path,
    decisions: &mut dyn DecisionProvider,
) -> Target {
    let input = input.trim().trim_matches(['\'', '"']);
    if input.is_empty() {
        return Target::Sync;
    }

    let path = PathBuf::from(input);
    if path.is_file() {
        return Target::File(path);
    }
    if path.is_dir() {
        return Target::Directory(path);
    }

    let mut matches = search(input, source_root);
    match (matches.folders.len(), matches.files.len()) {
        (0, 0) => Target::NotFound(input.to_string()),
        (1, 0) => Target::Directory(matches.folders.remove(0)),
        (0, 1) => Target::File(matches.files.remove(0)),
        _ => match decisions.choose_target(input, &matches.folders, &matches.files) {
            TargetChoice::Folder(i) if i < matches.folders.len() => {
                Target::Directory(matches.folders.swap_remove(i))
            }
            TargetChoice::File(i) if i < matches.files.len() => {
                Target::File(matches.files.swap_remove(i))
            }
            _ => Target::Quit,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedDecisions, Workspace};

    fn vault_with_notes() -> Workspace {
        let ws = Workspace::new();
        ws.note("Physics/Gravity Waves.md", "a");
        ws.note("Physics/Optics.md", "b");
        ws.note("Gravity Notes/index.md", "c");
        ws.note("Physics/gravity.png", "d");
        ws.note(".obsidian/gravity.md", "e");
        ws
    }

    #[test]
    fn search_matches_folders_and_markdown_files() {
        let ws = vault_with_notes();
        let m = search("GRAVITY", &ws.vault());
        assert_eq!(m.folders, vec![ws.vault().join("Gravity Notes")]);
        assert_eq!(m.files, vec![ws.vault().join("Physics/Gravity Waves.md")]);
    }

    #[test]
    fn empty_input_means_sync() {
        let ws = Workspace::new();
        let mut d = ScriptedDecisions::default();
        assert_eq!(resolve_target("  ", &ws.vault(), &mut d), Target::Sync);
    }

    #[test]
    fn quoted_existing_path() {
        let ws = vault_with_notes();
        let file = ws.vault().join("Physics/Optics.md");
        let mut d = ScriptedDecisions::default();
        let input = format!("'{}'", file.display());
        assert_eq!(resolve_target(&input, &ws.vault(), &mut d), Target::File(file));
    }

    #[test]
    fn existing_directory() {
        let ws = vault_with_notes();
        let dir = ws.vault().join("Physics");
        let mut d = ScriptedDecisions::default();
        assert_eq!(
            resolve_target(&dir.display().to_string(), &ws.vault(), &mut d),
            Target::Directory(dir)
        );
    }

    #[test]
    fn single_match_used_directly() {
        let ws = vault_with_notes();
        let mut d = ScriptedDecisions::default();
        assert_eq!(
            resolve_target("optics", &ws.vault(), &mut d),
            Target::File(ws.vault().join("Physics/Optics.md"))
        );
        assert!(d.searches().is_empty());
    }

    #[test]
    fn ambiguous_match_asks_provider() {
        let ws = vault_with_notes();
        let mut d = ScriptedDecisions::with_targets(&[TargetChoice::Folder(0)]);
        assert_eq!(
            resolve_target("gravity", &ws.vault(), &mut d),
            Target::Directory(ws.vault().join("Gravity Notes"))
        );
        assert_eq!(d.searches(), vec!["gravity".to_string()]);
    }

    #[test]
    fn provider_can_quit() {
        let ws = vault_with_notes();
        let mut d = ScriptedDecisions::with_targets(&[TargetChoice::Quit]);
        assert_eq!(resolve_target("gravity", &ws.vault(), &mut d), Target::Quit);
    }

    #[test]
    fn no_match() {
        let ws = vault_with_notes();
        let mut d = ScriptedDecisions::default();
        assert_eq!(
            resolve_target("quantum", &ws.vault(), &mut d),
            Target::NotFound("quantum".to_string())
        );
    }
}
