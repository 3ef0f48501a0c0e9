//! Live workspace file index
//!
//! Owns the mutable inventory of workspace paths, hands out immutable sorted
//! snapshots, and stays synchronized with the filesystem through create and
//! delete notifications. One async mutex guards the whole state: a rebuild
//! runs inside it, so concurrent `get_index` callers park on the lock and
//! observe the single in-flight rebuild instead of starting their own.

use crate::config::IgnorePolicy;
use crate::error::IndexError;
use crate::fs::{EntryKind, FsEvent, WatchGuard, WorkspaceFs};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One indexed file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the workspace root, forward-slash separated,
    /// case-preserved, no leading `./`
    pub relative_path: String,

    /// Cached lowercase relative path for case-insensitive filtering
    pub relative_path_lower: String,

    /// Base name
    pub name: String,

    /// Whether this entry is a directory
    pub is_directory: bool,

    /// Handle to the underlying filesystem object
    pub absolute_path: PathBuf,
}

impl IndexEntry {
    fn new(relative_path: String, is_directory: bool, absolute_path: PathBuf) -> Self {
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(relative_path.as_str())
            .to_string();
        let relative_path_lower = relative_path.to_lowercase();
        Self {
            relative_path,
            relative_path_lower,
            name,
            is_directory,
            absolute_path,
        }
    }
}

struct WatchSubscription {
    _guard: Box<dyn WatchGuard>,
    drain: JoinHandle<()>,
}

#[derive(Default)]
struct IndexState {
    root: Option<PathBuf>,
    entries: HashMap<String, IndexEntry>,
    snapshot: Option<Arc<[IndexEntry]>>,
    watch: Option<WatchSubscription>,
}

impl IndexState {
    fn sorted_snapshot(&mut self) -> Arc<[IndexEntry]> {
        match &self.snapshot {
            Some(snapshot) => Arc::clone(snapshot),
            None => {
                let mut entries: Vec<IndexEntry> = self.entries.values().cloned().collect();
                entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
                let snapshot: Arc<[IndexEntry]> = Arc::from(entries);
                self.snapshot = Some(Arc::clone(&snapshot));
                snapshot
            }
        }
    }

    fn drop_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.drain.abort();
        }
    }
}

/// Live index of one workspace root.
pub struct FileIndex<F: WorkspaceFs> {
    fs: Arc<F>,
    policy: Arc<IgnorePolicy>,
    state: Arc<Mutex<IndexState>>,
}

impl<F: WorkspaceFs> FileIndex<F> {
    pub fn new(fs: F, policy: IgnorePolicy) -> Self {
        Self {
            fs: Arc::new(fs),
            policy: Arc::new(policy),
            state: Arc::new(Mutex::new(IndexState::default())),
        }
    }

    pub(crate) fn policy(&self) -> &IgnorePolicy {
        &self.policy
    }

    /// Return the sorted snapshot for `root`, rebuilding first when the index
    /// is empty or `root` differs from the currently indexed root.
    ///
    /// The snapshot is immutable and detached: later index mutations never
    /// affect a handed-out copy.
    pub async fn get_index(&self, root: &Path) -> Result<Arc<[IndexEntry]>, IndexError> {
        let mut state = self.state.lock().await;
        if state.entries.is_empty() || state.root.as_deref() != Some(root) {
            self.rebuild(&mut state, root)?;
        }
        if state.watch.is_none() {
            self.arm_watch(&mut state, root);
        }
        Ok(state.sorted_snapshot())
    }

    /// Drop all indexed state. Idempotent; the watch subscription survives
    /// and the next `get_index` decides whether it still fits.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.snapshot = None;
        state.root = None;
    }

    /// Cancel the watch subscription and drop all state.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        state.drop_watch();
        state.entries.clear();
        state.snapshot = None;
        state.root = None;
    }

    fn rebuild(&self, state: &mut IndexState, root: &Path) -> Result<(), IndexError> {
        if state.root.as_deref() != Some(root) {
            // Subscription (if any) points at the old root
            state.drop_watch();
        }
        state.entries.clear();
        state.snapshot = None;
        state.root = None;

        let mut entries = HashMap::new();
        scan_directory(self.fs.as_ref(), &self.policy, root, "", &mut entries)?;
        debug!(root = %root.display(), entries = entries.len(), "index rebuilt");

        state.entries = entries;
        state.root = Some(root.to_path_buf());
        Ok(())
    }

    fn arm_watch(&self, state: &mut IndexState, root: &Path) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = match self.fs.watch(root, tx) {
            Ok(guard) => guard,
            Err(err) => {
                warn!(root = %root.display(), %err, "filesystem watch unavailable, index may go stale");
                return;
            }
        };

        let fs = Arc::clone(&self.fs);
        let policy = Arc::clone(&self.policy);
        let root = root.to_path_buf();
        // Weak reference: dropping the index closes the channel and ends the task
        let state_handle: Weak<Mutex<IndexState>> = Arc::downgrade(&self.state);

        let drain = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(state) = state_handle.upgrade() else {
                    break;
                };
                let mut state = state.lock().await;
                if state.root.as_deref() != Some(root.as_path()) {
                    // Root moved on; a fresh subscription replaces this one
                    break;
                }
                apply_event(fs.as_ref(), &policy, &mut state, &root, event);
            }
        });

        state.watch = Some(WatchSubscription {
            _guard: guard,
            drain,
        });
    }
}

/// Recursively register `dir`'s children under `prefix`.
///
/// The top-level call propagates a read failure (the root must be listable);
/// recursion swallows per-directory errors so one unreadable subtree never
/// aborts the scan.
fn scan_directory<F: WorkspaceFs>(
    fs: &F,
    policy: &IgnorePolicy,
    dir: &Path,
    prefix: &str,
    entries: &mut HashMap<String, IndexEntry>,
) -> std::io::Result<()> {
    let children = fs.read_dir(dir)?;
    for child in children {
        if policy.excludes_name(&child.name) {
            continue;
        }
        let relative = if prefix.is_empty() {
            child.name.clone()
        } else {
            format!("{prefix}/{}", child.name)
        };
        let absolute = dir.join(&child.name);
        let is_directory = child.kind == EntryKind::Directory;
        entries.insert(
            relative.clone(),
            IndexEntry::new(relative.clone(), is_directory, absolute.clone()),
        );
        if is_directory {
            if let Err(err) = scan_directory(fs, policy, &absolute, &relative, entries) {
                debug!(dir = %absolute.display(), %err, "skipping unreadable directory");
            }
        }
    }
    Ok(())
}

/// Compute the forward-slash relative key for `path` under `root`, or `None`
/// when the path escapes the root or is the root itself.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(&part.to_string_lossy());
            }
            // `..` or other oddities: treat as outside the root
            _ => return None,
        }
    }
    (!key.is_empty()).then_some(key)
}

fn apply_event<F: WorkspaceFs>(
    fs: &F,
    policy: &IgnorePolicy,
    state: &mut IndexState,
    root: &Path,
    event: FsEvent,
) {
    match event {
        FsEvent::Created(path) => handle_created(fs, policy, state, root, &path),
        FsEvent::Removed(path) => handle_removed(state, root, &path),
    }
}

fn handle_created<F: WorkspaceFs>(
    fs: &F,
    policy: &IgnorePolicy,
    state: &mut IndexState,
    root: &Path,
    path: &Path,
) {
    let Some(key) = relative_key(root, path) else {
        return;
    };
    if key.split('/').any(|segment| policy.excludes_name(segment)) {
        return;
    }
    let kind = match fs.entry_kind(path) {
        Ok(kind) => kind,
        Err(err) => {
            debug!(path = %path.display(), %err, "ignoring create event");
            return;
        }
    };
    let is_directory = kind == EntryKind::Directory;
    state.entries.insert(
        key.clone(),
        IndexEntry::new(key.clone(), is_directory, path.to_path_buf()),
    );
    if is_directory {
        // A moved-in directory arrives as a single event for its top
        if let Err(err) = scan_directory(fs, policy, path, &key, &mut state.entries) {
            debug!(dir = %path.display(), %err, "skipping unreadable created directory");
        }
    }
    state.snapshot = None;
}

fn handle_removed(state: &mut IndexState, root: &Path, path: &Path) {
    let Some(key) = relative_key(root, path) else {
        return;
    };
    let removed = state.entries.remove(&key);
    // Unknown entries still get a subtree sweep: the delete may have raced
    // ahead of the create that would have registered them
    let sweep_subtree = removed.as_ref().map_or(true, |entry| entry.is_directory);
    let mut changed = removed.is_some();
    if sweep_subtree {
        let prefix = format!("{key}/");
        let before = state.entries.len();
        state.entries.retain(|candidate, _| !candidate.starts_with(&prefix));
        changed |= state.entries.len() != before;
    }
    if changed {
        state.snapshot = None;
    }
}
