//! Working directory state detection.
//!
//! Compares every file in the working tree against the current branch's
//! latest commit to find which files are new or modified. Shared by
//! `commit` (auto-staging) and `status` (reporting only).

use std::fs;
use std::path::Path;

use log::warn;
use serde::Serialize;
use walkdir::WalkDir;

use crate::commit::Commit;
use crate::error::MinigitResult;
use crate::hash::hash_bytes;
use crate::snapshot::SnapshotStore;

/// The type of change detected for a file.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Not listed in the latest commit.
    New,
    /// Listed in the latest commit with different content.
    Modified,
}

/// A single file's status in the working directory.
#[derive(Debug, Clone, Serialize)]
pub struct FileState {
    pub path: String,
    pub status: FileStatus,
    /// Current content hash.
    pub hash: String,
}

/// Changes in the working directory relative to a commit, sorted by path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkingState {
    pub changes: Vec<FileState>,
    /// Files scanned in the working directory.
    pub scanned: usize,
}

impl WorkingState {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn paths(&self, status: FileStatus) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(move |f| f.status == status)
            .map(|f| f.path.as_str())
    }
}

/// Hidden entries and the repository's own storage are never tracked
/// implicitly.
fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Every regular file under `root`, as sorted forward-slash relative paths.
pub fn working_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry while scanning: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            Some(parts.join("/"))
        })
        .collect();
    files.sort();
    files
}

/// Classify working-directory files against `head` (the current branch's
/// latest commit). With no head, every file is new.
pub fn compute_state(
    root: &Path,
    head: Option<&Commit>,
    snapshots: &SnapshotStore,
) -> MinigitResult<WorkingState> {
    let files = working_files(root);
    let mut changes = Vec::new();

    for rel_path in &files {
        let content = match fs::read(root.join(rel_path)) {
            Ok(c) => c,
            Err(e) => {
                warn!("skipping unreadable file {rel_path}: {e}");
                continue;
            }
        };
        let current_hash = hash_bytes(&content);

        let status = match head {
            Some(commit) if commit.contains(rel_path) => {
                // A listed file whose snapshot copy is gone counts as modified
                // so the next commit captures it again.
                match snapshots.hash_of(&commit.id, rel_path)? {
                    Some(stored) if stored == current_hash => continue,
                    _ => FileStatus::Modified,
                }
            }
            _ => FileStatus::New,
        };

        changes.push(FileState {
            path: rel_path.clone(),
            status,
            hash: current_hash,
        });
    }

    Ok(WorkingState {
        changes,
        scanned: files.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn commit_of(store: &SnapshotStore, root: &Path, id: &str, files: &[&str]) -> Commit {
        let pairs: Vec<(String, std::path::PathBuf)> = files
            .iter()
            .map(|f| (f.to_string(), root.join(f)))
            .collect();
        store.create(id, &pairs).unwrap();
        Commit {
            id: id.to_string(),
            message: "snap".to_string(),
            timestamp: Utc::now(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_working_files_skips_hidden_and_storage() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".minigit/commits")).unwrap();
        fs::write(root.join(".minigit/index.json"), "{}").unwrap();
        fs::write(root.join(".env"), "SECRET=1").unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join(".cache/x"), "x").unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();

        assert_eq!(working_files(root), vec!["b.txt", "src/main.rs"]);
    }

    #[test]
    fn test_working_files_of_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert!(working_files(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_everything_new_without_head() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        let store = SnapshotStore::new(&dir.path().join("commits"));

        let state = compute_state(&root, None, &store).unwrap();
        assert_eq!(state.changes.len(), 1);
        assert_eq!(state.changes[0].status, FileStatus::New);
        assert_eq!(state.scanned, 1);
    }

    #[test]
    fn test_classifies_unchanged_modified_new() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(dir.path().join("commits")).unwrap();
        let store = SnapshotStore::new(&dir.path().join("commits"));

        fs::write(root.join("same.txt"), "same").unwrap();
        fs::write(root.join("edit.txt"), "before").unwrap();
        let head = commit_of(&store, &root, "c0ffee0", &["same.txt", "edit.txt"]);

        fs::write(root.join("edit.txt"), "after").unwrap();
        fs::write(root.join("fresh.txt"), "new").unwrap();

        let state = compute_state(&root, Some(&head), &store).unwrap();
        assert_eq!(state.paths(FileStatus::Modified).collect::<Vec<_>>(), vec!["edit.txt"]);
        assert_eq!(state.paths(FileStatus::New).collect::<Vec<_>>(), vec!["fresh.txt"]);
        assert!(!state.is_clean());
    }

    #[test]
    fn test_clean_when_matching_head() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(dir.path().join("commits")).unwrap();
        let store = SnapshotStore::new(&dir.path().join("commits"));

        fs::write(root.join("a.txt"), "a").unwrap();
        let head = commit_of(&store, &root, "abcdef0", &["a.txt"]);

        assert!(compute_state(&root, Some(&head), &store).unwrap().is_clean());
    }
}
