//! Repository — the main entry point for minigit operations.
//!
//! A Repository ties together the snapshot store, the state document
//! (`index.json`), the merge-request list and the configuration. Every
//! operation loads the state it needs, works on it in memory and writes it
//! back; no state is cached between calls.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::commit::{Commit, IdSeed};
use crate::config::{RepoConfig, SyncMode};
use crate::diff::{self, DiffReport};
use crate::error::{MinigitError, MinigitResult};
use crate::fsutil::remove_empty_dirs;
use crate::hash::hash_bytes;
use crate::index::{self, BranchInfo, Index};
use crate::lock::RepoLock;
use crate::pr::{MergeRequest, PrId, PrList, PrStatus};
use crate::snapshot::SnapshotStore;
use crate::state::{self, FileStatus};

/// The `.minigit` directory name.
pub const MINIGIT_DIR: &str = ".minigit";
const COMMITS_DIR: &str = "commits";
const INDEX_FILE: &str = "index.json";
const PRS_FILE: &str = "prs.json";
const CONFIG_FILE: &str = "config.json";

/// A minigit repository.
pub struct Repository {
    /// Root of the working directory (where `.minigit/` lives).
    root: PathBuf,
    /// Path to the `.minigit/` directory.
    minigit_dir: PathBuf,
    snapshots: SnapshotStore,
    config: RepoConfig,
}

impl Repository {
    /// Initialize a new repository with the default configuration.
    pub fn init(root: &Path) -> MinigitResult<Self> {
        Self::init_with_config(root, RepoConfig::default())
    }

    /// Initialize a new repository: an empty snapshot store, a single empty
    /// default branch that is current, an empty staging area and an empty
    /// merge-request list.
    pub fn init_with_config(root: &Path, config: RepoConfig) -> MinigitResult<Self> {
        let minigit_dir = root.join(MINIGIT_DIR);
        if minigit_dir.exists() {
            return Err(MinigitError::RepoAlreadyInitialized);
        }
        index::validate_branch_name(&config.default_branch)?;

        fs::create_dir_all(minigit_dir.join(COMMITS_DIR))?;
        config.save(&minigit_dir.join(CONFIG_FILE))?;
        PrList::default().save(&minigit_dir.join(PRS_FILE))?;
        Index::new(&config.default_branch).save(&minigit_dir.join(INDEX_FILE))?;

        info!("initialized repository in {}", minigit_dir.display());
        Self::open(root)
    }

    /// Open an existing repository rooted at `root`.
    pub fn open(root: &Path) -> MinigitResult<Self> {
        let minigit_dir = root.join(MINIGIT_DIR);
        if !minigit_dir.join(INDEX_FILE).is_file() {
            return Err(MinigitError::RepoNotInitialized);
        }
        let config = RepoConfig::load(&minigit_dir.join(CONFIG_FILE))?;
        let snapshots = SnapshotStore::new(&minigit_dir.join(COMMITS_DIR));

        Ok(Self {
            root: root.to_path_buf(),
            minigit_dir,
            snapshots,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Acquire an exclusive lock on the repository.
    fn lock(&self) -> MinigitResult<RepoLock> {
        RepoLock::acquire(&self.minigit_dir, self.config.lock_timeout())
    }

    // --- Staging ---

    /// Stage a file for the next commit.
    ///
    /// Re-adding a staged path is a no-op; `newly_staged` tells the two
    /// cases apart.
    pub fn add(&self, path: &str) -> MinigitResult<AddResult> {
        let _lock = self.lock()?;
        let rel_path = self.normalize_path(path)?;
        if !self.root.join(&rel_path).is_file() {
            return Err(MinigitError::FileNotFound(path.to_string()));
        }

        let mut index = self.load_index()?;
        let newly_staged = index.stage(&rel_path);
        if newly_staged {
            self.save_index(&index)?;
            debug!("staged {rel_path}");
        }

        Ok(AddResult {
            path: rel_path,
            newly_staged,
        })
    }

    /// Report the current branch, staged paths, and files that a commit
    /// would auto-stage. Nothing is modified.
    pub fn status(&self) -> MinigitResult<StatusReport> {
        let index = self.load_index()?;
        let head = index.head();
        let working = state::compute_state(&self.root, head, &self.snapshots)?;

        let unstaged = |status: FileStatus| {
            working
                .paths(status)
                .filter(|p| !index.is_staged(p))
                .map(String::from)
                .collect::<Vec<_>>()
        };

        Ok(StatusReport {
            branch: index.current_branch.clone(),
            head: head.cloned(),
            staged: index.staged.clone(),
            modified: unstaged(FileStatus::Modified),
            untracked: unstaged(FileStatus::New),
        })
    }

    // --- Commits ---

    /// Commit the staged files plus every new or modified file in the
    /// working directory to the current branch.
    pub fn commit(&self, message: &str) -> MinigitResult<Commit> {
        let _lock = self.lock()?;
        self.snapshots.sweep_temp()?;
        let mut index = self.load_index()?;
        let head = index.head().cloned();

        let working = state::compute_state(&self.root, head.as_ref(), &self.snapshots)?;
        for change in &working.changes {
            if index.stage(&change.path) {
                debug!("auto-staged {:?} file {}", change.status, change.path);
            }
        }

        if index.staged.is_empty() {
            return Err(MinigitError::NothingToCommit);
        }

        let mut contents = Vec::with_capacity(index.staged.len());
        let mut sources = Vec::with_capacity(index.staged.len());
        for rel_path in &index.staged {
            let full_path = self.root.join(rel_path);
            if !full_path.is_file() {
                return Err(MinigitError::FileNotFound(rel_path.clone()));
            }
            contents.push((rel_path.clone(), hash_bytes(&fs::read(&full_path)?)));
            sources.push((rel_path.clone(), full_path));
        }

        let timestamp = Utc::now();
        let id = self.fresh_id(&index, |nonce| {
            IdSeed {
                parent: head.as_ref().map(|c| c.id.as_str()),
                message,
                timestamp,
                contents: &contents,
                nonce,
            }
            .derive()
        });

        self.snapshots.create(&id, &sources)?;

        let commit = Commit {
            id,
            message: message.to_string(),
            timestamp,
            files: std::mem::take(&mut index.staged),
        };
        index.push_commit(commit.clone())?;
        self.save_index(&index)?;

        info!(
            "committed {} to {} ({} file(s))",
            commit.id,
            index.current_branch,
            commit.files.len()
        );
        Ok(commit)
    }

    /// Commits of the current branch, newest first.
    pub fn log(&self) -> MinigitResult<Vec<Commit>> {
        let index = self.load_index()?;
        Ok(index.current_commits().iter().rev().cloned().collect())
    }

    /// Pick an id for a new commit, bumping the nonce until it is unused
    /// both in the state document and in the snapshot store.
    fn fresh_id(&self, index: &Index, derive: impl Fn(u32) -> String) -> String {
        let mut nonce = 0;
        loop {
            let id = derive(nonce);
            if !self.snapshots.exists(&id) && index.find_commit(&id).is_err() {
                return id;
            }
            debug!("commit id {id} already taken, retrying");
            nonce += 1;
        }
    }

    // --- Branches ---

    /// Create a branch as a copy of the current branch's history.
    pub fn branch(&self, name: &str) -> MinigitResult<()> {
        let _lock = self.lock()?;
        let mut index = self.load_index()?;
        if index.has_branch(name) {
            return Err(MinigitError::BranchExists(name.to_string()));
        }
        index::validate_branch_name(name)?;
        index.create_branch(name)?;
        self.save_index(&index)?;
        info!("created branch {name} from {}", index.current_branch);
        Ok(())
    }

    /// Switch to `name`, restoring the files of its latest commit.
    pub fn checkout(&self, name: &str) -> MinigitResult<SyncReport> {
        let _lock = self.lock()?;
        let mut index = self.load_index()?;
        if !index.has_branch(name) {
            return Err(MinigitError::BranchNotFound(name.to_string()));
        }

        let previous = index.head().cloned();
        index.current_branch = name.to_string();
        let target = index.head().cloned();

        let report = match target {
            Some(ref tip) => self.sync_working_dir(name, tip, previous.as_ref())?,
            None => SyncReport::empty(name),
        };
        self.save_index(&index)?;

        info!("switched to branch {name}");
        Ok(report)
    }

    pub fn list(&self) -> MinigitResult<Vec<BranchInfo>> {
        Ok(self.load_index()?.list_branches())
    }

    /// Delete a branch. The current and the default branch are protected.
    pub fn delete(&self, name: &str) -> MinigitResult<()> {
        let _lock = self.lock()?;
        let mut index = self.load_index()?;
        index.delete_branch(name, &self.config.default_branch)?;
        self.save_index(&index)?;
        info!("deleted branch {name}");
        Ok(())
    }

    // --- Merge requests ---

    pub fn create_pr(&self, source: &str, target: &str) -> MinigitResult<MergeRequest> {
        let _lock = self.lock()?;
        let index = self.load_index()?;
        for branch in [source, target] {
            if !index.has_branch(branch) {
                return Err(MinigitError::BranchNotFound(branch.to_string()));
            }
        }

        let mut prs = self.load_prs()?;
        let pr = prs.open(source, target).clone();
        self.save_prs(&prs)?;
        info!("opened pull request #{} {source} -> {target}", pr.id);
        Ok(pr)
    }

    pub fn pr_list(&self) -> MinigitResult<Vec<MergeRequest>> {
        Ok(self.load_prs()?.requests)
    }

    /// Merge an open request by appending the source commits the target
    /// lacks. There is no conflict detection: histories are assumed linear.
    pub fn pr_merge(&self, id: PrId) -> MinigitResult<MergeResult> {
        let _lock = self.lock()?;
        let mut prs = self.load_prs()?;
        let mut index = self.load_index()?;

        let pr = prs.get_open_mut(id)?;
        let appended = index.union_append(&pr.source, &pr.target)?;
        pr.status = PrStatus::Merged;
        let merged = pr.clone();

        self.save_index(&index)?;
        self.save_prs(&prs)?;

        info!(
            "merged pull request #{id}: {} commit(s) appended to {}",
            appended.len(),
            merged.target
        );
        Ok(MergeResult {
            pr: merged,
            appended,
        })
    }

    // --- Diffs ---

    /// Diff two commits by id. Either may live on any branch.
    pub fn diff(&self, old_id: &str, new_id: &str) -> MinigitResult<DiffReport> {
        let index = self.load_index()?;
        let old = index.find_commit(old_id)?;
        let new = index.find_commit(new_id)?;
        self.diff_report(format!("commit {old_id}..{new_id}"), old, new)
    }

    /// Diff the latest commits of two branches.
    pub fn diff_branch(&self, old_branch: &str, new_branch: &str) -> MinigitResult<DiffReport> {
        let index = self.load_index()?;
        let old = index.tip(old_branch)?;
        let new = index.tip(new_branch)?;
        self.diff_report(
            format!(
                "branch '{old_branch}' ({}) .. '{new_branch}' ({})",
                old.id, new.id
            ),
            old,
            new,
        )
    }

    /// Diff a merge request: source tip against target tip. Merged requests
    /// can still be diffed.
    pub fn pr_diff(&self, id: PrId) -> MinigitResult<DiffReport> {
        let prs = self.load_prs()?;
        let pr = prs.get(id)?;
        let index = self.load_index()?;
        let source = index.tip(&pr.source)?;
        let target = index.tip(&pr.target)?;
        self.diff_report(
            format!(
                "PR #{id}: {} ({}) -> {} ({})",
                pr.source, source.id, pr.target, target.id
            ),
            source,
            target,
        )
    }

    fn diff_report(&self, description: String, old: &Commit, new: &Commit) -> MinigitResult<DiffReport> {
        let files = diff::compare_commits(&self.snapshots, old, new, &self.config.diff)?;
        Ok(DiffReport {
            description,
            from: old.id.clone(),
            to: new.id.clone(),
            files,
        })
    }

    // --- History rewriting ---

    /// Undo `commit_id` by committing a copy of the commit right before it
    /// and restoring those files in the working directory.
    pub fn revert(&self, commit_id: &str) -> MinigitResult<RevertResult> {
        let _lock = self.lock()?;
        let mut index = self.load_index()?;
        let position = index.position_in_current(commit_id)?;
        if position == 0 {
            return Err(MinigitError::CannotRevertRootCommit(commit_id.to_string()));
        }

        let restored_from = index.current_commits()[position - 1].clone();
        let previous_tip = index.head().cloned();
        self.snapshots
            .verify(&restored_from.id, &restored_from.files)?;

        let message = format!("Revert commit {commit_id}");
        let mut contents = Vec::with_capacity(restored_from.files.len());
        let mut sources = Vec::with_capacity(restored_from.files.len());
        for rel_path in &restored_from.files {
            let src = self.snapshots.file_path(&restored_from.id, rel_path);
            contents.push((rel_path.clone(), hash_bytes(&fs::read(&src)?)));
            sources.push((rel_path.clone(), src));
        }

        let timestamp = Utc::now();
        let id = self.fresh_id(&index, |nonce| {
            IdSeed {
                parent: previous_tip.as_ref().map(|c| c.id.as_str()),
                message: &message,
                timestamp,
                contents: &contents,
                nonce,
            }
            .derive()
        });
        self.snapshots.create(&id, &sources)?;

        let commit = Commit {
            id,
            message,
            timestamp,
            files: restored_from.files.clone(),
        };
        let branch = index.current_branch.clone();
        let sync = self.sync_working_dir(&branch, &commit, previous_tip.as_ref())?;

        index.push_commit(commit.clone())?;
        index.clear_staged();
        self.save_index(&index)?;

        info!("reverted {commit_id} on {branch} as {}", commit.id);
        Ok(RevertResult {
            commit,
            reverted: commit_id.to_string(),
            restored_from: restored_from.id,
            sync,
        })
    }

    /// Truncate the current branch so `commit_id` is its tip, clear the
    /// staging area and restore that commit's files. Later commits are
    /// dropped from this branch; their snapshots stay in the store.
    pub fn reset(&self, commit_id: &str) -> MinigitResult<ResetResult> {
        let _lock = self.lock()?;
        let mut index = self.load_index()?;
        let position = index.position_in_current(commit_id)?;
        if position + 1 == index.current_commits().len() {
            return Err(MinigitError::AlreadyAtCommit(commit_id.to_string()));
        }

        let target = index.current_commits()[position].clone();
        let previous_tip = index.head().cloned();
        let branch = index.current_branch.clone();

        let sync = self.sync_working_dir(&branch, &target, previous_tip.as_ref())?;
        let discarded = index.truncate_current(position)?;
        index.clear_staged();
        self.save_index(&index)?;

        info!(
            "reset {branch} to {commit_id}, discarded {} commit(s)",
            discarded.len()
        );
        Ok(ResetResult {
            discarded: discarded.into_iter().map(|c| c.id).collect(),
            sync,
        })
    }

    /// Bring the working directory in line with `target`.
    ///
    /// Files listed in `target` are overwritten from its snapshot. In
    /// [`SyncMode::Clean`], files listed in `previous` but not in `target`
    /// are also deleted; other files on disk are never touched.
    fn sync_working_dir(
        &self,
        branch: &str,
        target: &Commit,
        previous: Option<&Commit>,
    ) -> MinigitResult<SyncReport> {
        let restored = self
            .snapshots
            .restore(&target.id, &target.files, &self.root)?;

        let mut removed = Vec::new();
        if self.config.sync_mode == SyncMode::Clean {
            let stale = previous
                .into_iter()
                .flat_map(|c| c.files.iter())
                .filter(|f| !target.contains(f));
            for rel_path in stale {
                let full_path = self.root.join(rel_path);
                if full_path.is_file() {
                    fs::remove_file(&full_path)?;
                    removed.push(rel_path.clone());
                }
                if let Some(parent) = full_path.parent() {
                    if let Err(e) = remove_empty_dirs(parent, &self.root) {
                        warn!("could not prune empty directories under {}: {e}", parent.display());
                    }
                }
            }
        }

        debug!(
            "synced working directory to {}: {} restored, {} removed",
            target.id,
            restored.len(),
            removed.len()
        );
        Ok(SyncReport {
            branch: branch.to_string(),
            commit: Some(target.id.clone()),
            restored,
            removed,
        })
    }

    // --- Internals ---

    /// Turn user input into a forward-slash path relative to the root.
    ///
    /// Rejects paths that leave the working directory or point into
    /// `.minigit/`.
    fn normalize_path(&self, input: &str) -> MinigitResult<String> {
        let invalid = || MinigitError::InvalidPath(input.to_string());
        let path = Path::new(input);
        let relative = if path.is_absolute() {
            let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
            let parent = path.parent().map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()));
            let full = match (parent, path.file_name()) {
                (Some(parent), Some(name)) => parent.join(name),
                _ => path.to_path_buf(),
            };
            full.strip_prefix(&root).map_err(|_| invalid())?.to_path_buf()
        } else {
            path.to_path_buf()
        };

        // Resolve `.` and `..` lexically; only a `..` that climbs above the
        // root is an escape.
        let mut parts: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
                Component::CurDir => {}
                Component::ParentDir => {
                    parts.pop().ok_or_else(invalid)?;
                }
                _ => return Err(invalid()),
            }
        }
        if parts.is_empty() || parts[0] == MINIGIT_DIR {
            return Err(invalid());
        }
        Ok(parts.join("/"))
    }

    fn load_index(&self) -> MinigitResult<Index> {
        Index::load(&self.minigit_dir.join(INDEX_FILE))
    }

    fn save_index(&self, index: &Index) -> MinigitResult<()> {
        index.save(&self.minigit_dir.join(INDEX_FILE))
    }

    fn load_prs(&self) -> MinigitResult<PrList> {
        PrList::load(&self.minigit_dir.join(PRS_FILE))
    }

    fn save_prs(&self, prs: &PrList) -> MinigitResult<()> {
        prs.save(&self.minigit_dir.join(PRS_FILE))
    }
}

/// Result of `add`.
#[derive(Debug, Clone, Serialize)]
pub struct AddResult {
    /// Normalized repository-relative path.
    pub path: String,
    /// False if the path was already staged.
    pub newly_staged: bool,
}

/// Result of `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub branch: String,
    pub head: Option<Commit>,
    pub staged: Vec<String>,
    /// Files changed since the head commit and not yet staged.
    pub modified: Vec<String>,
    /// Files absent from the head commit and not yet staged.
    pub untracked: Vec<String>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }
}

/// What checkout, revert and reset did to the working directory.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub branch: String,
    /// Commit the working directory was synced to (None for an empty branch).
    pub commit: Option<String>,
    pub restored: Vec<String>,
    /// Files deleted in clean sync mode.
    pub removed: Vec<String>,
}

impl SyncReport {
    fn empty(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            commit: None,
            restored: Vec::new(),
            removed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub pr: MergeRequest,
    /// Ids appended to the target branch, in source order.
    pub appended: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevertResult {
    /// The new commit.
    pub commit: Commit,
    pub reverted: String,
    /// The commit whose content was restored.
    pub restored_from: String,
    pub sync: SyncReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResult {
    /// Ids dropped from the branch, oldest first.
    pub discarded: Vec<String>,
    pub sync: SyncReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    fn ids(commits: &[Commit]) -> Vec<String> {
        commits.iter().map(|c| c.id.clone()).collect()
    }

    fn branch_ids(repo: &Repository, branch: &str) -> Vec<String> {
        ids(repo.load_index().unwrap().commits(branch).unwrap())
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let minigit = dir.path().join(".minigit");
        assert!(minigit.join("commits").is_dir());
        assert!(minigit.join("index.json").is_file());
        assert!(minigit.join("prs.json").is_file());
        assert!(minigit.join("config.json").is_file());

        let index = Index::load(&minigit.join("index.json")).unwrap();
        assert_eq!(index, Index::new("main"));
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        assert!(matches!(
            Repository::init(dir.path()),
            Err(MinigitError::RepoAlreadyInitialized)
        ));
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Repository::open(dir.path()),
            Err(MinigitError::RepoNotInitialized)
        ));
    }

    #[test]
    fn test_init_with_custom_default_branch() {
        let dir = tempdir().unwrap();
        let config = RepoConfig {
            default_branch: "trunk".to_string(),
            ..RepoConfig::default()
        };
        let repo = Repository::init_with_config(dir.path(), config).unwrap();
        assert_eq!(repo.status().unwrap().branch, "trunk");
        assert_eq!(repo.config().default_branch, "trunk");
    }

    #[test]
    fn test_add_missing_file() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            repo.add("nope.txt"),
            Err(MinigitError::FileNotFound(p)) if p == "nope.txt"
        ));
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "b.txt", "b");

        assert!(repo.add("b.txt").unwrap().newly_staged);
        assert!(repo.add("./a.txt").unwrap().newly_staged);
        assert!(!repo.add("b.txt").unwrap().newly_staged);
        assert_eq!(repo.status().unwrap().staged, vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_add_rejects_paths_outside_working_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        fs::create_dir_all(&root).unwrap();
        write(dir.path(), "outside.txt", "x");
        let repo = Repository::init(&root).unwrap();

        assert!(matches!(
            repo.add("../outside.txt"),
            Err(MinigitError::InvalidPath(_))
        ));
        assert!(matches!(
            repo.add(".minigit/index.json"),
            Err(MinigitError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_add_resolves_parent_components_inside_root() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        fs::create_dir_all(dir.path().join("sub")).unwrap();

        let result = repo.add("sub/../a.txt").unwrap();
        assert_eq!(result.path, "a.txt");
        assert!(!repo.add("./sub/.././a.txt").unwrap().newly_staged);
        assert!(matches!(
            repo.add("sub/../../a.txt"),
            Err(MinigitError::InvalidPath(_))
        ));
        assert!(matches!(
            repo.add("sub/../.minigit/index.json"),
            Err(MinigitError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_add_accepts_absolute_path_inside_root() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "src/lib.rs", "//");

        let abs = dir.path().join("src/lib.rs");
        let result = repo.add(abs.to_str().unwrap()).unwrap();
        assert_eq!(result.path, "src/lib.rs");
    }

    #[test]
    fn test_first_and_second_commit_then_diff() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        write(dir.path(), "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        let first = repo.commit("first").unwrap();
        assert_eq!(first.files, vec!["a.txt"]);
        assert_eq!(first.id.len(), 7);
        assert_eq!(branch_ids(&repo, "main"), vec![first.id.clone()]);

        write(dir.path(), "a.txt", "hello\nworld\n");
        let second = repo.commit("second").unwrap();
        assert_eq!(second.files, vec!["a.txt"]);
        assert_ne!(first.id, second.id);
        assert!(repo.status().unwrap().staged.is_empty());

        let snapshot = dir.path().join(".minigit/commits").join(&second.id).join("a.txt");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), "hello\nworld\n");

        let report = repo.diff(&first.id, &second.id).unwrap();
        assert_eq!(report.files.len(), 1);
        let file = &report.files[0];
        assert_eq!(file.path, "a.txt");
        assert_eq!(file.change_type, diff::ChangeType::Modified);
        assert_eq!((file.additions, file.deletions), (1, 0));
        assert!(file.excerpt.contains(&"+world".to_string()));
    }

    #[test]
    fn test_commit_nothing_fails() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            repo.commit("empty"),
            Err(MinigitError::NothingToCommit)
        ));

        write(dir.path(), "a.txt", "a");
        repo.commit("first").unwrap();
        assert!(matches!(
            repo.commit("again"),
            Err(MinigitError::NothingToCommit)
        ));
        assert_eq!(repo.log().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_auto_stages_only_changes() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "keep.txt", "keep");
        write(dir.path(), "edit.txt", "v1");
        let first = repo.commit("first").unwrap();
        assert_eq!(first.files, vec!["edit.txt", "keep.txt"]);

        write(dir.path(), "edit.txt", "v2");
        write(dir.path(), "nested/new.txt", "new");
        write(dir.path(), ".hidden", "skip");
        let second = repo.commit("second").unwrap();
        assert_eq!(second.files, vec!["edit.txt", "nested/new.txt"]);
    }

    #[test]
    fn test_snapshot_matches_working_copy() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "alpha");
        write(dir.path(), "dir/b.bin", "\0binary\x7f");
        let commit = repo.commit("snap").unwrap();

        for rel in &commit.files {
            let stored = fs::read(
                dir.path()
                    .join(".minigit/commits")
                    .join(&commit.id)
                    .join(rel),
            )
            .unwrap();
            assert_eq!(stored, fs::read(dir.path().join(rel)).unwrap());
        }
        let snapshot_files = state::working_files(&dir.path().join(".minigit/commits").join(&commit.id));
        assert_eq!(snapshot_files, commit.files);
    }

    #[test]
    fn test_staged_file_deleted_before_commit() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), ".env", "x");
        repo.add(".env").unwrap();
        fs::remove_file(dir.path().join(".env")).unwrap();

        assert!(matches!(
            repo.commit("broken"),
            Err(MinigitError::FileNotFound(p)) if p == ".env"
        ));
        assert!(repo.log().unwrap().is_empty());
        assert_eq!(repo.status().unwrap().staged, vec![".env"]);
    }

    #[test]
    fn test_explicitly_added_hidden_file_is_committed() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), ".config", "x");
        repo.add(".config").unwrap();
        let commit = repo.commit("hidden").unwrap();
        assert_eq!(commit.files, vec![".config"]);
    }

    #[test]
    fn test_status_is_read_only() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "b.txt", "b");
        repo.commit("first").unwrap();

        write(dir.path(), "a.txt", "changed");
        write(dir.path(), "c.txt", "c");
        write(dir.path(), "d.txt", "d");
        repo.add("d.txt").unwrap();

        let status = repo.status().unwrap();
        assert_eq!(status.branch, "main");
        assert_eq!(status.head.unwrap().message, "first");
        assert_eq!(status.staged, vec!["d.txt"]);
        assert_eq!(status.modified, vec!["a.txt"]);
        assert_eq!(status.untracked, vec!["c.txt"]);

        assert_eq!(repo.status().unwrap().staged, vec!["d.txt"]);
    }

    #[test]
    fn test_log_newest_first() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "1");
        let c1 = repo.commit("one").unwrap();
        write(dir.path(), "a.txt", "2");
        let c2 = repo.commit("two").unwrap();

        assert_eq!(ids(&repo.log().unwrap()), vec![c2.id, c1.id]);
    }

    #[test]
    fn test_branch_copies_history_by_value() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "1");
        let c1 = repo.commit("one").unwrap();

        repo.branch("feature").unwrap();
        write(dir.path(), "a.txt", "2");
        let c2 = repo.commit("two on main").unwrap();

        assert_eq!(branch_ids(&repo, "feature"), vec![c1.id.clone()]);
        assert_eq!(branch_ids(&repo, "main"), vec![c1.id, c2.id]);
        assert!(matches!(
            repo.branch("feature"),
            Err(MinigitError::BranchExists(_))
        ));
        assert!(matches!(
            repo.branch("bad name"),
            Err(MinigitError::InvalidBranchName(_))
        ));
    }

    #[test]
    fn test_checkout_restores_tip_content() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "main v1");
        repo.commit("one").unwrap();
        repo.branch("feature").unwrap();

        write(dir.path(), "a.txt", "main v2");
        repo.commit("two").unwrap();

        let report = repo.checkout("feature").unwrap();
        assert_eq!(report.restored, vec!["a.txt"]);
        assert_eq!(read(dir.path(), "a.txt"), "main v1");
        assert_eq!(repo.status().unwrap().branch, "feature");

        repo.checkout("main").unwrap();
        assert_eq!(read(dir.path(), "a.txt"), "main v2");
    }

    #[test]
    fn test_checkout_unknown_branch() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            repo.checkout("ghost"),
            Err(MinigitError::BranchNotFound(_))
        ));
        assert_eq!(repo.status().unwrap().branch, "main");
    }

    #[test]
    fn test_checkout_empty_branch_leaves_files() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.branch("empty").unwrap();
        write(dir.path(), "a.txt", "a");
        repo.commit("one").unwrap();

        let report = repo.checkout("empty").unwrap();
        assert!(report.commit.is_none());
        assert_eq!(read(dir.path(), "a.txt"), "a");
    }

    #[test]
    fn test_partial_checkout_leaves_untracked_files() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        repo.commit("one").unwrap();
        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write(dir.path(), "b.txt", "feature only");
        repo.commit("add b").unwrap();

        let report = repo.checkout("main").unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(read(dir.path(), "b.txt"), "feature only");
    }

    #[test]
    fn test_clean_checkout_removes_files_absent_from_target() {
        let dir = tempdir().unwrap();
        let config = RepoConfig {
            sync_mode: SyncMode::Clean,
            ..RepoConfig::default()
        };
        let repo = Repository::init_with_config(dir.path(), config).unwrap();
        write(dir.path(), "a.txt", "a");
        repo.commit("one").unwrap();
        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write(dir.path(), "a.txt", "a2");
        write(dir.path(), "sub/b.txt", "feature only");
        repo.commit("add b").unwrap();
        write(dir.path(), "scratch.txt", "never committed");

        let report = repo.checkout("main").unwrap();
        assert_eq!(report.removed, vec!["sub/b.txt"]);
        assert!(!dir.path().join("sub").exists());
        assert_eq!(read(dir.path(), "a.txt"), "a");
        assert_eq!(read(dir.path(), "scratch.txt"), "never committed");
    }

    #[test]
    fn test_clean_checkout_tolerates_already_deleted_directory() {
        let dir = tempdir().unwrap();
        let config = RepoConfig {
            sync_mode: SyncMode::Clean,
            ..RepoConfig::default()
        };
        let repo = Repository::init_with_config(dir.path(), config).unwrap();
        write(dir.path(), "a.txt", "a");
        repo.commit("one").unwrap();
        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write(dir.path(), "sub/b.txt", "feature only");
        repo.commit("add b").unwrap();
        fs::remove_dir_all(dir.path().join("sub")).unwrap();

        let report = repo.checkout("main").unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(repo.status().unwrap().branch, "main");
    }

    #[test]
    fn test_list_marks_current_branch() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();

        let list = repo.list().unwrap();
        let current: Vec<&str> = list
            .iter()
            .filter(|b| b.current)
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(current, vec!["feature"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_delete_main_rules() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            repo.delete("main"),
            Err(MinigitError::CannotDeleteCurrentBranch(_))
        ));

        repo.branch("other").unwrap();
        repo.checkout("other").unwrap();
        assert!(matches!(
            repo.delete("main"),
            Err(MinigitError::CannotDeleteDefaultBranch(_))
        ));
        assert!(matches!(
            repo.delete("ghost"),
            Err(MinigitError::BranchNotFound(_))
        ));

        repo.checkout("main").unwrap();
        repo.delete("other").unwrap();
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_pull_request_flow() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        let base = repo.commit("base").unwrap();

        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write(dir.path(), "b.txt", "b");
        let feature_commit = repo.commit("add b").unwrap();

        let pr = repo.create_pr("feature", "main").unwrap();
        assert_eq!(pr.id, PrId(1));
        assert_eq!(pr.status, PrStatus::Open);

        let diff = repo.pr_diff(PrId(1)).unwrap();
        assert_eq!(diff.from, feature_commit.id);
        assert_eq!(diff.to, base.id);

        let result = repo.pr_merge(PrId(1)).unwrap();
        assert_eq!(result.appended, vec![feature_commit.id.clone()]);
        assert_eq!(branch_ids(&repo, "main"), vec![base.id, feature_commit.id]);
        assert_eq!(repo.pr_list().unwrap()[0].status, PrStatus::Merged);

        assert!(matches!(
            repo.pr_merge(PrId(1)),
            Err(MinigitError::PrNotFound(1))
        ));
        // Merged requests can still be diffed.
        assert!(repo.pr_diff(PrId(1)).is_ok());
    }

    #[test]
    fn test_create_pr_requires_both_branches() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            repo.create_pr("ghost", "main"),
            Err(MinigitError::BranchNotFound(b)) if b == "ghost"
        ));
        assert!(repo.pr_list().unwrap().is_empty());
        assert!(matches!(
            repo.pr_merge(PrId(7)),
            Err(MinigitError::PrNotFound(7))
        ));
    }

    #[test]
    fn test_pr_merge_with_deleted_source_changes_nothing() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.branch("feature").unwrap();
        repo.create_pr("feature", "main").unwrap();
        repo.delete("feature").unwrap();

        assert!(matches!(
            repo.pr_merge(PrId(1)),
            Err(MinigitError::BranchNotFound(_))
        ));
        assert_eq!(repo.pr_list().unwrap()[0].status, PrStatus::Open);
    }

    #[test]
    fn test_pr_merge_keeps_target_order() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "1");
        let c1 = repo.commit("one").unwrap();
        repo.branch("feature").unwrap();

        write(dir.path(), "a.txt", "main");
        let m1 = repo.commit("main work").unwrap();

        repo.checkout("feature").unwrap();
        write(dir.path(), "f.txt", "f");
        let f1 = repo.commit("feature work").unwrap();

        repo.create_pr("feature", "main").unwrap();
        repo.pr_merge(PrId(1)).unwrap();
        assert_eq!(branch_ids(&repo, "main"), vec![c1.id, m1.id, f1.id]);
    }

    #[test]
    fn test_diff_commit_against_itself_is_empty() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        let c = repo.commit("one").unwrap();
        assert!(repo.diff(&c.id, &c.id).unwrap().is_empty());
        assert!(matches!(
            repo.diff(&c.id, "0000000"),
            Err(MinigitError::CommitNotFound(_))
        ));
    }

    #[test]
    fn test_diff_branch() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.branch("empty").unwrap();
        write(dir.path(), "a.txt", "a");
        repo.commit("one").unwrap();
        repo.branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write(dir.path(), "b.txt", "b1\nb2\n");
        repo.commit("two").unwrap();

        // Commits list only the files they captured, so a.txt drops out.
        let report = repo.diff_branch("main", "feature").unwrap();
        let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert_eq!(report.files[0].change_type, diff::ChangeType::Removed);
        assert_eq!(report.files[1].change_type, diff::ChangeType::Added);
        assert_eq!(report.files[1].excerpt, vec!["+ b1", "+ b2"]);
        assert_eq!(report.total_additions(), 2);

        assert!(matches!(
            repo.diff_branch("main", "empty"),
            Err(MinigitError::BranchHasNoCommits(b)) if b == "empty"
        ));
        assert!(matches!(
            repo.diff_branch("main", "ghost"),
            Err(MinigitError::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_revert_restores_previous_commit() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "original");
        let c1 = repo.commit("first").unwrap();
        write(dir.path(), "a.txt", "modified");
        let c2 = repo.commit("second").unwrap();

        let result = repo.revert(&c2.id).unwrap();
        assert_eq!(result.restored_from, c1.id);
        assert_eq!(result.commit.message, format!("Revert commit {}", c2.id));
        assert_eq!(result.commit.files, c1.files);
        assert_eq!(read(dir.path(), "a.txt"), "original");
        assert_eq!(
            branch_ids(&repo, "main"),
            vec![c1.id.clone(), c2.id.clone(), result.commit.id.clone()]
        );

        let snapshot = dir
            .path()
            .join(".minigit/commits")
            .join(&result.commit.id)
            .join("a.txt");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), "original");
    }

    #[test]
    fn test_revert_errors() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        let root = repo.commit("root").unwrap();

        assert!(matches!(
            repo.revert(&root.id),
            Err(MinigitError::CannotRevertRootCommit(_))
        ));
        assert!(matches!(
            repo.revert("fffffff"),
            Err(MinigitError::CommitNotFound(_))
        ));
        assert_eq!(repo.log().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_truncates_and_restores() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "v1");
        let c1 = repo.commit("one").unwrap();
        write(dir.path(), "a.txt", "v2");
        let c2 = repo.commit("two").unwrap();
        write(dir.path(), "a.txt", "v3");
        let c3 = repo.commit("three").unwrap();
        write(dir.path(), "x.txt", "x");
        repo.add("x.txt").unwrap();

        let result = repo.reset(&c1.id).unwrap();
        assert_eq!(result.discarded, vec![c2.id.clone(), c3.id.clone()]);
        assert_eq!(branch_ids(&repo, "main"), vec![c1.id.clone()]);
        assert_eq!(read(dir.path(), "a.txt"), "v1");
        assert!(repo.status().unwrap().staged.is_empty());
        // Dropped snapshots stay in the store.
        assert!(dir.path().join(".minigit/commits").join(&c3.id).is_dir());
    }

    #[test]
    fn test_reset_twice_reports_already_at_commit() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "v1");
        let c1 = repo.commit("one").unwrap();
        write(dir.path(), "a.txt", "v2");
        repo.commit("two").unwrap();

        repo.reset(&c1.id).unwrap();
        let before = fs::read(dir.path().join(".minigit/index.json")).unwrap();
        assert!(matches!(
            repo.reset(&c1.id),
            Err(MinigitError::AlreadyAtCommit(_))
        ));
        let after = fs::read(dir.path().join(".minigit/index.json")).unwrap();
        assert_eq!(before, after);
        assert!(matches!(
            repo.reset("fffffff"),
            Err(MinigitError::CommitNotFound(_))
        ));
    }

    #[test]
    fn test_clean_reset_removes_later_files() {
        let dir = tempdir().unwrap();
        let config = RepoConfig {
            sync_mode: SyncMode::Clean,
            ..RepoConfig::default()
        };
        let repo = Repository::init_with_config(dir.path(), config).unwrap();
        write(dir.path(), "a.txt", "v1");
        let c1 = repo.commit("one").unwrap();
        write(dir.path(), "a.txt", "v2");
        write(dir.path(), "b.txt", "later");
        repo.commit("two").unwrap();

        let result = repo.reset(&c1.id).unwrap();
        assert_eq!(result.sync.removed, vec!["b.txt"]);
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_missing_snapshot_aborts_checkout() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.txt", "a");
        let c1 = repo.commit("one").unwrap();
        repo.branch("feature").unwrap();
        fs::remove_dir_all(dir.path().join(".minigit/commits").join(&c1.id)).unwrap();

        assert!(matches!(
            repo.checkout("feature"),
            Err(MinigitError::SnapshotMissing { .. })
        ));
        assert_eq!(repo.status().unwrap().branch, "main");
    }

    #[test]
    fn test_commit_ids_unique_under_rapid_commits() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut seen = std::collections::HashSet::new();
        for i in 0..25 {
            write(dir.path(), "a.txt", &format!("{i}"));
            let c = repo.commit("same message").unwrap();
            assert!(seen.insert(c.id));
        }
    }
}
