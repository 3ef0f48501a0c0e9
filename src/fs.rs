//! Abstract filesystem capability and its std/notify implementation
//!
//! The index never touches the filesystem directly: it lists directories,
//! stats paths and subscribes to create/delete notifications through
//! [`WorkspaceFs`]. Production uses [`StdFs`]; tests swap in an in-memory
//! double.

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Kind of a filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    pub name: String,
    pub kind: EntryKind,
}

/// Filesystem mutation relevant to the index. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created(PathBuf),
    Removed(PathBuf),
}

/// Keeps a watch subscription alive; dropping it cancels the watch.
pub trait WatchGuard: Send {}

/// Read-only filesystem capability consumed by the index.
pub trait WorkspaceFs: Send + Sync + 'static {
    /// List a directory's immediate children with their kinds.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirChild>>;

    /// Stat a path's kind.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Watch a directory subtree recursively; create/delete events are sent
    /// on `events` until the returned guard is dropped.
    fn watch(&self, root: &Path, events: UnboundedSender<FsEvent>)
        -> io::Result<Box<dyn WatchGuard>>;
}

/// [`WorkspaceFs`] backed by `std::fs` and `notify`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl StdFs {
    pub fn new() -> Self {
        Self
    }
}

impl WorkspaceFs for StdFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirChild>> {
        let mut children = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    trace!(dir = %path.display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            let kind = match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::File,
                Err(err) => {
                    trace!(path = %entry.path().display(), %err, "skipping unstattable entry");
                    continue;
                }
            };
            children.push(DirChild {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(children)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let metadata = std::fs::metadata(path)?;
        Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn watch(
        &self,
        root: &Path,
        events: UnboundedSender<FsEvent>,
    ) -> io::Result<Box<dyn WatchGuard>> {
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                let event = match result {
                    Ok(event) => event,
                    Err(err) => {
                        trace!(%err, "watch error ignored");
                        return;
                    }
                };
                for fs_event in translate_event(&event) {
                    // Receiver gone means the subscription was disposed
                    let _ = events.send(fs_event);
                }
            })
            .map_err(io::Error::other)?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(io::Error::other)?;
        Ok(Box::new(NotifyGuard { _watcher: watcher }))
    }
}

struct NotifyGuard {
    _watcher: RecommendedWatcher,
}

impl WatchGuard for NotifyGuard {}

/// Map a notify event onto index-relevant create/remove events.
///
/// Renames arrive in platform-dependent shapes: a single event carrying both
/// paths, or separate events for the source and the target. For the latter an
/// existence check decides which side this is. Anything else (content or
/// metadata modifications, unknown payloads) is ignored.
fn translate_event(event: &notify::Event) -> Vec<FsEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|path| FsEvent::Created(path.clone()))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|path| FsEvent::Removed(path.clone()))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut translated = Vec::new();
            if let [from, to, ..] = event.paths.as_slice() {
                translated.push(FsEvent::Removed(from.clone()));
                translated.push(FsEvent::Created(to.clone()));
            }
            translated
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                if path.exists() {
                    FsEvent::Created(path.clone())
                } else {
                    FsEvent::Removed(path.clone())
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
