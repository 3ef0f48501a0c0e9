//! End-to-end completion tests against a real temporary workspace

use mention_search::{Completer, FileIndex, IgnorePolicy, SearchConfig, StdFs};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn create_test_project() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();

    fs::write(root.join("README.md"), "# Test Project").unwrap();
    fs::write(root.join(".env"), "SECRET=1").unwrap();
    fs::create_dir(root.join("src")).unwrap();
    fs::write(root.join("src/index.ts"), "export {}").unwrap();
    fs::write(root.join("src/index.test.ts"), "test()").unwrap();
    fs::create_dir_all(root.join("src/utils")).unwrap();
    fs::write(root.join("src/utils/format.ts"), "export {}").unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "module.exports = {}").unwrap();

    (temp_dir, root)
}

async fn complete(completer: &Completer, root: &Path, typed: &str) -> Vec<String> {
    completer
        .get_completions(typed, typed.len(), Some(root))
        .await
        .into_iter()
        .map(|suggestion| suggestion.path)
        .collect()
}

#[tokio::test]
async fn index_normalizes_and_filters_real_paths() {
    let (_temp_dir, root) = create_test_project();
    let index = FileIndex::new(StdFs::new(), IgnorePolicy::default());

    let snapshot = index.get_index(&root).await.unwrap();
    let paths: Vec<&str> = snapshot.iter().map(|e| e.relative_path.as_str()).collect();

    assert!(paths.contains(&"src/index.ts"));
    assert!(paths.contains(&"src/utils/format.ts"));
    assert!(paths.contains(&".env"));
    assert!(!paths.iter().any(|p| p.contains("node_modules")));
    for path in &paths {
        assert!(!path.starts_with("./"));
        assert!(!path.contains('\\'));
    }

    // identical snapshot on a second read with no filesystem change
    let again = index.get_index(&root).await.unwrap();
    assert_eq!(snapshot.as_ref(), again.as_ref());

    index.dispose().await;
}

#[tokio::test]
async fn completions_rank_and_cap_end_to_end() {
    let (_temp_dir, root) = create_test_project();
    let completer = Completer::new(SearchConfig::default());

    let paths = complete(&completer, &root, "see @src/i").await;
    assert_eq!(paths[0], "src/index.ts");
    assert!(paths.contains(&"src/index.test.ts".to_string()));

    let paths = complete(&completer, &root, "@src/").await;
    assert_eq!(paths, vec!["src/index.test.ts", "src/index.ts", "src/utils"]);

    let paths = complete(&completer, &root, "@").await;
    assert!(paths.contains(&".env".to_string()));
    assert!(!paths.iter().any(|p| p.contains('/')));

    completer.dispose().await;
}

#[tokio::test]
async fn root_change_rebuilds_against_new_workspace() {
    let (_first_dir, first_root) = create_test_project();
    let second_dir = TempDir::new().unwrap();
    let second_root = second_dir.path().to_path_buf();
    fs::write(second_root.join("other.rs"), "fn main() {}").unwrap();

    let index = FileIndex::new(StdFs::new(), IgnorePolicy::default());

    let first = index.get_index(&first_root).await.unwrap();
    assert!(first.iter().any(|e| e.relative_path == "src/index.ts"));

    let second = index.get_index(&second_root).await.unwrap();
    assert!(second.iter().any(|e| e.relative_path == "other.rs"));
    assert!(!second.iter().any(|e| e.relative_path == "src/index.ts"));

    index.dispose().await;
}

/// Poll the index until `predicate` holds or the deadline passes.
async fn wait_for<F>(index: &FileIndex<StdFs>, root: &Path, predicate: F) -> bool
where
    F: Fn(&[mention_search::IndexEntry]) -> bool,
{
    for _ in 0..100 {
        let snapshot = index.get_index(root).await.unwrap();
        if predicate(&snapshot) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Watcher latency is platform-dependent (FSEvents can take seconds), so the
/// live-update tests only run on demand: `cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn watcher_picks_up_created_files() {
    let (_temp_dir, root) = create_test_project();
    let index = FileIndex::new(StdFs::new(), IgnorePolicy::default());
    index.get_index(&root).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    fs::write(root.join("src/fresh.ts"), "export {}").unwrap();

    let appeared = wait_for(&index, &root, |snapshot| {
        snapshot.iter().any(|e| e.relative_path == "src/fresh.ts")
    })
    .await;
    assert!(appeared, "created file should appear in the index");

    index.dispose().await;
}

#[tokio::test]
#[ignore]
async fn watcher_drops_deleted_subtrees() {
    let (_temp_dir, root) = create_test_project();
    let index = FileIndex::new(StdFs::new(), IgnorePolicy::default());
    index.get_index(&root).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    fs::remove_dir_all(root.join("src/utils")).unwrap();

    let gone = wait_for(&index, &root, |snapshot| {
        !snapshot
            .iter()
            .any(|e| e.relative_path.starts_with("src/utils"))
    })
    .await;
    assert!(gone, "deleted subtree should leave the index");

    index.dispose().await;
}
