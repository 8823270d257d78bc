//! The repository state document, stored as `.minigit/index.json`.
//!
//! Holds the staging area, every branch's commit sequence and the current
//! branch. Operations load the whole document, mutate it in memory and save
//! it back; nothing here touches the working directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{MinigitError, MinigitResult};
use crate::fsutil::atomic_write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Index {
    /// Paths pending inclusion in the next commit, in insertion order.
    pub staged: Vec<String>,
    /// Branch name -> commits, oldest first.
    pub branches: BTreeMap<String, Vec<Commit>>,
    pub current_branch: String,
}

/// One row of `list()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub current: bool,
    pub commits: usize,
}

impl Index {
    /// A fresh state with a single empty branch that is also current.
    pub fn new(default_branch: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(default_branch.to_string(), Vec::new());
        Self {
            staged: Vec::new(),
            branches,
            current_branch: default_branch.to_string(),
        }
    }

    pub fn load(path: &Path) -> MinigitResult<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save the state (atomic: temp + fsync + rename).
    pub fn save(&self, path: &Path) -> MinigitResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    // --- Staging area ---

    /// Stage a path. Returns false if it was already staged.
    pub fn stage(&mut self, rel_path: &str) -> bool {
        if self.is_staged(rel_path) {
            return false;
        }
        self.staged.push(rel_path.to_string());
        true
    }

    pub fn is_staged(&self, rel_path: &str) -> bool {
        self.staged.iter().any(|p| p == rel_path)
    }

    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    // --- Branch registry ---

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    pub fn commits(&self, branch: &str) -> MinigitResult<&[Commit]> {
        self.branches
            .get(branch)
            .map(Vec::as_slice)
            .ok_or_else(|| MinigitError::BranchNotFound(branch.to_string()))
    }

    fn commits_mut(&mut self, branch: &str) -> MinigitResult<&mut Vec<Commit>> {
        self.branches
            .get_mut(branch)
            .ok_or_else(|| MinigitError::BranchNotFound(branch.to_string()))
    }

    /// Commits of the current branch, oldest first.
    pub fn current_commits(&self) -> &[Commit] {
        self.branches
            .get(&self.current_branch)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Latest commit of the current branch.
    pub fn head(&self) -> Option<&Commit> {
        self.current_commits().last()
    }

    /// Latest commit of `branch`.
    pub fn tip(&self, branch: &str) -> MinigitResult<&Commit> {
        self.commits(branch)?
            .last()
            .ok_or_else(|| MinigitError::BranchHasNoCommits(branch.to_string()))
    }

    /// Position of `commit_id` within the current branch.
    pub fn position_in_current(&self, commit_id: &str) -> MinigitResult<usize> {
        self.current_commits()
            .iter()
            .position(|c| c.id == commit_id)
            .ok_or_else(|| MinigitError::CommitNotFound(commit_id.to_string()))
    }

    /// Find a commit record on any branch.
    pub fn find_commit(&self, commit_id: &str) -> MinigitResult<&Commit> {
        self.branches
            .values()
            .flat_map(|commits| commits.iter())
            .find(|c| c.id == commit_id)
            .ok_or_else(|| MinigitError::CommitNotFound(commit_id.to_string()))
    }

    /// Append a commit to the current branch.
    pub fn push_commit(&mut self, commit: Commit) -> MinigitResult<()> {
        let branch = self.current_branch.clone();
        self.commits_mut(&branch)?.push(commit);
        Ok(())
    }

    /// Create `name` as a value copy of the current branch's history.
    pub fn create_branch(&mut self, name: &str) -> MinigitResult<()> {
        if self.has_branch(name) {
            return Err(MinigitError::BranchExists(name.to_string()));
        }
        let history = self.current_commits().to_vec();
        self.branches.insert(name.to_string(), history);
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str, default_branch: &str) -> MinigitResult<()> {
        if !self.has_branch(name) {
            return Err(MinigitError::BranchNotFound(name.to_string()));
        }
        if name == self.current_branch {
            return Err(MinigitError::CannotDeleteCurrentBranch(name.to_string()));
        }
        if name == default_branch {
            return Err(MinigitError::CannotDeleteDefaultBranch(name.to_string()));
        }
        self.branches.remove(name);
        Ok(())
    }

    pub fn list_branches(&self) -> Vec<BranchInfo> {
        self.branches
            .iter()
            .map(|(name, commits)| BranchInfo {
                name: name.clone(),
                current: *name == self.current_branch,
                commits: commits.len(),
            })
            .collect()
    }

    /// Drop every commit after position `keep` on the current branch.
    pub fn truncate_current(&mut self, keep: usize) -> MinigitResult<Vec<Commit>> {
        let branch = self.current_branch.clone();
        let commits = self.commits_mut(&branch)?;
        Ok(commits.split_off(keep + 1))
    }

    /// Append to `target` every commit of `source` whose id `target` lacks,
    /// in source order. Returns the ids that were appended.
    pub fn union_append(&mut self, source: &str, target: &str) -> MinigitResult<Vec<String>> {
        let incoming = union_new_commits(self.commits(source)?, self.commits(target)?);
        let ids = incoming.iter().map(|c| c.id.clone()).collect();
        self.commits_mut(target)?.extend(incoming);
        Ok(ids)
    }
}

/// Commits of `source` whose ids do not appear in `target`, in source order.
///
/// Also deduplicates within `source` itself so the result never introduces
/// a repeated id into the target.
pub fn union_new_commits(source: &[Commit], target: &[Commit]) -> Vec<Commit> {
    let mut seen: std::collections::HashSet<&str> =
        target.iter().map(|c| c.id.as_str()).collect();
    source
        .iter()
        .filter(|c| seen.insert(c.id.as_str()))
        .cloned()
        .collect()
}

/// Validate a new branch name.
///
/// Names become JSON keys and CLI arguments, so reject anything that would
/// be awkward there: empty names, path separators, leading `.` or `-`,
/// whitespace and control characters.
pub fn validate_branch_name(name: &str) -> MinigitResult<()> {
    let bad = name.is_empty()
        || name.len() > 255
        || name.starts_with('.')
        || name.starts_with('-')
        || name.contains("..")
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());
    if bad {
        return Err(MinigitError::InvalidBranchName(name.to_string()));
    }
    Ok(())
}
