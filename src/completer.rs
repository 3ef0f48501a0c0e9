//! Completion orchestration
//!
//! Ties the pieces together: locate the anchor in the typed text, parse the
//! fragment, pull an index snapshot, filter and score candidates, then return
//! a ranked, capped suggestion list. Completion is a best-effort affordance:
//! no failure here ever reaches the caller as an error.

use crate::config::{IgnorePolicy, SearchConfig};
use crate::context::{build_search_context, SearchContext};
use crate::fs::{StdFs, WorkspaceFs};
use crate::fuzzy::fuzzy_match;
use crate::index::{FileIndex, IndexEntry};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// A fuzzy-query score considered good enough to stop scanning once the
/// match-count target is also met.
const EARLY_EXIT_SCORE: f64 = 200.0;

/// One ranked completion candidate handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSuggestion {
    /// Anchor + relative path, directories suffixed with `/`
    pub label: String,

    /// Relative path of the suggested entry
    pub path: String,

    /// Whether the suggestion is a directory
    pub is_directory: bool,
}

struct RankedEntry<'a> {
    entry: &'a IndexEntry,
    score: f64,
    label: String,
}

/// Path-mention completion engine over a live [`FileIndex`].
pub struct Completer<F: WorkspaceFs = StdFs> {
    index: FileIndex<F>,
    config: SearchConfig,
}

impl Completer<StdFs> {
    /// Completer over the real filesystem.
    pub fn new(config: SearchConfig) -> Self {
        Self::with_fs(StdFs::new(), config)
    }
}

impl Default for Completer<StdFs> {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl<F: WorkspaceFs> Completer<F> {
    /// Completer over a custom filesystem capability.
    pub fn with_fs(fs: F, config: SearchConfig) -> Self {
        Self {
            index: FileIndex::new(fs, IgnorePolicy::default()),
            config,
        }
    }

    /// The underlying index, for hosts that manage its lifecycle directly.
    pub fn index(&self) -> &FileIndex<F> {
        &self.index
    }

    /// Release the watch subscription and drop indexed state.
    pub async fn dispose(&self) {
        self.index.dispose().await;
    }

    /// Compute ranked suggestions for the mention fragment under the cursor.
    ///
    /// Returns an empty list when there is no active fragment, no workspace
    /// root, or the index cannot be built — never an error.
    pub async fn get_completions(
        &self,
        text: &str,
        cursor: usize,
        root: Option<&Path>,
    ) -> Vec<CompletionSuggestion> {
        let Some(root) = root else {
            return Vec::new();
        };
        let Some((_, fragment)) = active_fragment(text, cursor, self.config.anchor) else {
            return Vec::new();
        };
        let context = build_search_context(fragment);

        let snapshot = match self.index.get_index(root).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(root = %root.display(), %err, "completion index unavailable");
                return Vec::new();
            }
        };

        let mut ranked = self.scan(&snapshot, &context);
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.label.cmp(&b.label))
        });
        ranked.truncate(self.config.max_suggestions);

        ranked
            .into_iter()
            .map(|ranked| CompletionSuggestion {
                label: ranked.label,
                path: ranked.entry.relative_path.clone(),
                is_directory: ranked.entry.is_directory,
            })
            .collect()
    }

    /// The `[anchor, cursor)` span a chosen suggestion should replace.
    pub fn get_replacement_range(&self, text: &str, cursor: usize) -> Option<(usize, usize)> {
        let cursor = floor_char_boundary(text, cursor);
        let anchor_index = text[..cursor].rfind(self.config.anchor)?;
        Some((anchor_index, cursor))
    }

    /// Walk the snapshot under the scan budget, keeping in-scope, visible,
    /// matching entries. Stops early once the match target is reached and,
    /// for fuzzy queries, a high-confidence score has been observed; this
    /// bounds latency at the cost of exact top-K on very large indexes.
    fn scan<'a>(&self, snapshot: &'a [IndexEntry], context: &SearchContext) -> Vec<RankedEntry<'a>> {
        let has_pattern = !context.search_pattern.is_empty();
        let prefix_lower = context.path_prefix.to_lowercase();
        let mut ranked = Vec::new();
        let mut best_score = f64::MIN;

        for entry in snapshot.iter().take(self.config.max_scanned_entries) {
            if !in_scope(entry, context, &prefix_lower) {
                continue;
            }
            if !self.is_visible(entry, context) {
                continue;
            }
            let score = if has_pattern {
                match fuzzy_match(&context.search_pattern, &entry.relative_path) {
                    Some(result) => result.score,
                    None => continue,
                }
            } else {
                0.0
            };
            best_score = best_score.max(score);
            ranked.push(RankedEntry {
                entry,
                score,
                label: self.label_for(entry),
            });
            if ranked.len() >= self.config.target_match_count
                && (!has_pattern || best_score >= EARLY_EXIT_SCORE)
            {
                break;
            }
        }
        ranked
    }

    /// Hidden entries surface only for dot-prefixed suffixes or allow-listed
    /// base names.
    fn is_visible(&self, entry: &IndexEntry, context: &SearchContext) -> bool {
        if !IgnorePolicy::is_hidden(&entry.relative_path) {
            return true;
        }
        if context.suffix.starts_with('.') {
            return true;
        }
        self.index.policy().is_always_visible(&entry.name)
    }

    fn label_for(&self, entry: &IndexEntry) -> String {
        let slash = if entry.is_directory { "/" } else { "" };
        format!("{}{}{}", self.config.anchor, entry.relative_path, slash)
    }
}

/// Containment filter: constrained-parent immediate child, top-level entry,
/// or anything when a fuzzy pattern is active.
fn in_scope(entry: &IndexEntry, context: &SearchContext, prefix_lower: &str) -> bool {
    if !prefix_lower.is_empty() {
        let Some(rest) = entry.relative_path_lower.strip_prefix(prefix_lower) else {
            return false;
        };
        return !rest.is_empty() && !rest.contains('/');
    }
    if context.immediate_only {
        return !entry.relative_path.contains('/');
    }
    true
}

/// Locate the anchor nearest before the cursor and return its byte index and
/// the fragment. A fragment containing whitespace means the mention was
/// abandoned mid-sentence.
fn active_fragment(text: &str, cursor: usize, anchor: char) -> Option<(usize, &str)> {
    let cursor = floor_char_boundary(text, cursor);
    let before = &text[..cursor];
    let anchor_index = before.rfind(anchor)?;
    let fragment = &before[anchor_index + anchor.len_utf8()..];
    if fragment.chars().any(char::is_whitespace) {
        return None;
    }
    Some((anchor_index, fragment))
}

fn floor_char_boundary(text: &str, cursor: usize) -> usize {
    let mut index = cursor.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mem::MemoryFs;
    use std::path::PathBuf;

    fn sample_completer() -> (Completer<MemoryFs>, PathBuf) {
        let fs = MemoryFs::new();
        let root = PathBuf::from("/workspace");
        fs.add_dir(&root);
        fs.add_file(root.join("README.md"));
        fs.add_file(root.join("src/index.ts"));
        fs.add_file(root.join("src/index.test.ts"));
        fs.add_file(root.join("src/utils/format.ts"));
        fs.add_file(root.join(".env"));
        fs.add_file(root.join(".secret"));
        (Completer::with_fs(fs, SearchConfig::default()), root)
    }

    async fn complete(
        completer: &Completer<MemoryFs>,
        root: &Path,
        typed: &str,
    ) -> Vec<CompletionSuggestion> {
        completer
            .get_completions(typed, typed.len(), Some(root))
            .await
    }

    #[tokio::test]
    async fn fragment_pattern_ranks_shorter_prefix_match_first() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "check @src/i").await;

        let paths: Vec<&str> = suggestions.iter().map(|s| s.path.as_str()).collect();
        assert!(paths.contains(&"src/index.ts"));
        assert!(paths.contains(&"src/index.test.ts"));
        assert_eq!(paths[0], "src/index.ts");
    }

    #[tokio::test]
    async fn trailing_slash_lists_immediate_children_only() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "@src/").await;

        let paths: Vec<&str> = suggestions.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["src/index.test.ts", "src/index.ts", "src/utils"]);
    }

    #[tokio::test]
    async fn empty_fragment_lists_top_level_with_allow_listed_hidden() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "@").await;

        let paths: Vec<&str> = suggestions.iter().map(|s| s.path.as_str()).collect();
        assert!(paths.contains(&".env"));
        assert!(paths.contains(&"README.md"));
        assert!(paths.contains(&"src"));
        assert!(!paths.contains(&".secret"));
        // no grandchildren in a top-level listing
        assert!(!paths.iter().any(|p| p.contains('/')));
    }

    #[tokio::test]
    async fn dot_fragment_reveals_hidden_entries() {
        let (completer, root) = sample_completer();

        let suggestions = complete(&completer, &root, "@.s").await;
        assert!(suggestions.iter().any(|s| s.path == ".secret"));

        let suggestions = complete(&completer, &root, "@.e").await;
        assert!(suggestions.iter().any(|s| s.path == ".env"));
    }

    #[tokio::test]
    async fn non_dot_fragment_never_reveals_hidden_entries() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "@sec").await;
        assert!(!suggestions.iter().any(|s| s.path == ".secret"));
    }

    #[tokio::test]
    async fn directories_get_trailing_slash_labels() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "@").await;

        let src = suggestions.iter().find(|s| s.path == "src").unwrap();
        assert!(src.is_directory);
        assert_eq!(src.label, "@src/");

        let readme = suggestions.iter().find(|s| s.path == "README.md").unwrap();
        assert!(!readme.is_directory);
        assert_eq!(readme.label, "@README.md");
    }

    #[tokio::test]
    async fn whitespace_in_fragment_deactivates_completion() {
        let (completer, root) = sample_completer();
        let typed = "@src and more";
        let suggestions = completer
            .get_completions(typed, typed.len(), Some(&root))
            .await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn no_anchor_means_no_completions() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "plain text").await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn missing_root_yields_empty_list() {
        let (completer, _) = sample_completer();
        let suggestions = completer.get_completions("@src", 4, None).await;
        assert!(suggestions.is_empty());

        let suggestions = completer
            .get_completions("@src", 4, Some(Path::new("/nonexistent")))
            .await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn repeated_queries_are_byte_identical() {
        let (completer, root) = sample_completer();
        let first = complete(&completer, &root, "@src/i").await;
        let second = complete(&completer, &root, "@src/i").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn suggestions_are_capped() {
        let fs = MemoryFs::new();
        let root = PathBuf::from("/workspace");
        fs.add_dir(&root);
        for i in 0..10 {
            fs.add_file(root.join(format!("file{i}.rs")));
        }
        let completer = Completer::with_fs(fs, SearchConfig::default().with_max_suggestions(3));
        let suggestions = complete(&completer, &root, "@").await;
        assert_eq!(suggestions.len(), 3);
    }

    #[tokio::test]
    async fn scan_budget_bounds_examined_entries() {
        let fs = MemoryFs::new();
        let root = PathBuf::from("/workspace");
        fs.add_dir(&root);
        fs.add_file(root.join("aaa.rs"));
        fs.add_file(root.join("bbb.rs"));
        let completer = Completer::with_fs(fs, SearchConfig::default().with_max_scanned_entries(1));
        let suggestions = complete(&completer, &root, "@").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].path, "aaa.rs");
    }

    #[tokio::test]
    async fn early_exit_stops_after_confident_matches() {
        let fs = MemoryFs::new();
        let root = PathBuf::from("/workspace");
        fs.add_dir(&root);
        fs.add_file(root.join("alpha.rs"));
        fs.add_file(root.join("zz_alpha_copy.rs"));
        let completer = Completer::with_fs(fs, SearchConfig::default().with_target_match_count(1));
        // `alpha.rs` is scanned first and prefix-matches well above the
        // confidence bar, so the scan never reaches the copy
        let suggestions = complete(&completer, &root, "@alpha").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].path, "alpha.rs");
    }

    #[tokio::test]
    async fn replacement_range_spans_anchor_to_cursor() {
        let (completer, _) = sample_completer();
        assert_eq!(completer.get_replacement_range("hello @src", 10), Some((6, 10)));
        assert_eq!(completer.get_replacement_range("@a", 2), Some((0, 2)));
        assert_eq!(completer.get_replacement_range("no anchor here", 14), None);
    }

    #[tokio::test]
    async fn suggestions_serialize_for_the_host() {
        let (completer, root) = sample_completer();
        let suggestions = complete(&completer, &root, "@README").await;
        let json = serde_json::to_string(&suggestions[0]).unwrap();
        assert!(json.contains("\"label\":\"@README.md\""));
        assert!(json.contains("\"is_directory\":false"));
    }
}
