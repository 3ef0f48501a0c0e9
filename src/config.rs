//! Search limits and the fixed ignore policy

use std::collections::HashSet;

/// Configuration for completion behavior
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Trigger character that begins a path-mention fragment
    pub anchor: char,

    /// Maximum number of index entries examined per request
    pub max_scanned_entries: usize,

    /// Number of matches after which the scan may stop early
    pub target_match_count: usize,

    /// Maximum number of suggestions returned
    pub max_suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            anchor: '@',
            max_scanned_entries: 32_000,
            target_match_count: 100,
            max_suggestions: 50,
        }
    }
}

impl SearchConfig {
    /// Create a new search config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trigger character
    pub fn with_anchor(mut self, anchor: char) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the per-request scan budget
    pub fn with_max_scanned_entries(mut self, max: usize) -> Self {
        self.max_scanned_entries = max;
        self
    }

    /// Set the early-exit match target
    pub fn with_target_match_count(mut self, target: usize) -> Self {
        self.target_match_count = target;
        self
    }

    /// Set the maximum number of suggestions returned
    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }
}

/// Names that are never indexed, regardless of where they appear.
const EXCLUDED_NAMES: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    "venv",
    ".venv",
    "env",
    ".DS_Store",
    "Thumbs.db",
];

/// Hidden names that stay visible even without a dot-prefixed query.
const ALWAYS_VISIBLE: &[&str] = &[".gitignore", ".env", ".editorconfig"];

/// Fixed filter applied while scanning and when deciding suggestion visibility.
///
/// Exclusion happens at index time: an excluded name is never registered and
/// never descended into. Hidden entries (a path segment starting with `.`) are
/// indexed but only surface when the typed suffix opts into them or the base
/// name is on the allow-list.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    excluded_names: HashSet<&'static str>,
    always_visible: HashSet<&'static str>,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self {
            excluded_names: EXCLUDED_NAMES.iter().copied().collect(),
            always_visible: ALWAYS_VISIBLE.iter().copied().collect(),
        }
    }
}

impl IgnorePolicy {
    /// Whether a single path segment is excluded from indexing.
    pub fn excludes_name(&self, name: &str) -> bool {
        self.excluded_names.contains(name)
    }

    /// Whether a hidden base name is visible without a dot-prefixed query.
    pub fn is_always_visible(&self, name: &str) -> bool {
        self.always_visible.contains(name)
    }

    /// Whether a relative path contains a hidden segment.
    pub fn is_hidden(relative_path: &str) -> bool {
        relative_path.split('/').any(|segment| segment.starts_with('.'))
    }
}
