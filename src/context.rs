//! Typed-fragment parsing
//!
//! Turns the raw text between the anchor character and the cursor into a
//! structured query description. Pure string work, no filesystem access.

/// Structured interpretation of a typed path fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchContext {
    /// Final path segment of the fragment; drives hidden-entry visibility
    pub suffix: String,

    /// Fuzzy query over the whole index, or empty when listing
    pub search_pattern: String,

    /// Explicit parent-directory constraint, or empty
    pub path_prefix: String,

    /// Restrict results to immediate children of the constrained parent
    /// (or of the workspace root when no prefix is set)
    pub immediate_only: bool,
}

/// Build a [`SearchContext`] from a typed fragment.
///
/// - empty fragment: top-level listing
/// - fragment ending in `/`: immediate children of that directory
/// - anything else: fuzzy search with the fragment as pattern
pub fn build_search_context(fragment: &str) -> SearchContext {
    if fragment.is_empty() {
        return SearchContext {
            immediate_only: true,
            ..SearchContext::default()
        };
    }

    let suffix = fragment.rsplit('/').next().unwrap_or(fragment).to_string();

    if fragment.ends_with('/') {
        SearchContext {
            suffix,
            search_pattern: String::new(),
            path_prefix: fragment.to_string(),
            immediate_only: true,
        }
    } else {
        SearchContext {
            suffix,
            search_pattern: fragment.to_string(),
            path_prefix: String::new(),
            immediate_only: false,
        }
    }
}
