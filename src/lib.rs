//! Live file index and fuzzy path completion for @-mention autocomplete
//!
//! As a user types a partial path after a trigger character in a chat-style
//! coding tool, [`Completer::get_completions`] returns a ranked, bounded list
//! of matching workspace files and directories:
//!
//! - [`FileIndex`] keeps an in-memory inventory of workspace paths, built by
//!   a recursive scan and kept consistent through filesystem create/delete
//!   notifications.
//! - [`fuzzy_match`] scores one pattern against one candidate with prefix,
//!   word-boundary, consecutive-run and subsequence strategies.
//! - [`SearchContext`] describes what a typed fragment asks for: a top-level
//!   listing, a directory's children, or a fuzzy query.
//! - [`Completer`] orchestrates the three under scan-size and result-count
//!   budgets and never surfaces an error — the worst outcome of any failure
//!   is an empty suggestion list.
//!
//! ```no_run
//! use mention_search::{Completer, SearchConfig};
//! use std::path::Path;
//!
//! # async fn example() {
//! let completer = Completer::new(SearchConfig::default());
//! let suggestions = completer
//!     .get_completions("fix the bug in @src/ind", 23, Some(Path::new("/repo")))
//!     .await;
//! for suggestion in suggestions {
//!     println!("{}", suggestion.label);
//! }
//! # }
//! ```

pub mod completer;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod fuzzy;
pub mod index;

pub use completer::{Completer, CompletionSuggestion};
pub use config::{IgnorePolicy, SearchConfig};
pub use context::{build_search_context, SearchContext};
pub use error::IndexError;
pub use fs::{DirChild, EntryKind, FsEvent, StdFs, WatchGuard, WorkspaceFs};
pub use fuzzy::{fuzzy_match, FuzzyMatch, MatchStrategy};
pub use index::{FileIndex, IndexEntry};
