//! Error types for the file index

use thiserror::Error;

/// Errors surfaced at the [`FileIndex`](crate::index::FileIndex) boundary.
///
/// The completer absorbs these into an empty suggestion list; they exist so
/// hosts embedding the index directly can tell failure modes apart. Errors on
/// individual subdirectories or watch events never reach this type — those are
/// logged and the affected subtree is omitted.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The workspace root itself could not be read.
    #[error("failed to read workspace root: {0}")]
    Io(#[from] std::io::Error),
}
