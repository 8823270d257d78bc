//! Error types for minigit operations.

use std::io;

use thiserror::Error;

/// All possible minigit errors.
#[derive(Debug, Error)]
pub enum MinigitError {
    /// The directory is not a minigit repository.
    #[error("not a minigit repository (run `minigit init` first)")]
    RepoNotInitialized,
    /// A minigit repository already exists here.
    #[error("repository already initialized")]
    RepoAlreadyInitialized,
    /// A path given to `add` (or a staged path at commit time) is missing.
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// The path escapes the working directory or points into `.minigit/`.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Nothing staged and nothing detected.
    #[error("no changes to commit")]
    NothingToCommit,
    #[error("branch not found: {0}")]
    BranchNotFound(String),
    #[error("branch already exists: {0}")]
    BranchExists(String),
    #[error("invalid branch name: {0:?}")]
    InvalidBranchName(String),
    #[error("cannot delete the current branch '{0}'")]
    CannotDeleteCurrentBranch(String),
    #[error("cannot delete the default branch '{0}'")]
    CannotDeleteDefaultBranch(String),
    /// The branch exists but has no commits to compare.
    #[error("branch '{0}' has no commits")]
    BranchHasNoCommits(String),
    #[error("commit not found: {0}")]
    CommitNotFound(String),
    #[error("cannot revert the root commit {0} (use reset to discard history)")]
    CannotRevertRootCommit(String),
    /// `reset` targeted the current branch tip.
    #[error("already at commit {0}")]
    AlreadyAtCommit(String),
    /// No open merge request with this id (or, for diffs, none at all).
    #[error("pull request #{0} not found or already merged")]
    PrNotFound(u32),
    #[error("invalid pull request id '{0}': must be a positive number")]
    InvalidPrIdFormat(String),
    /// A commit references a snapshot file that is absent from the store.
    #[error("snapshot of commit {commit} is missing '{path}'")]
    SnapshotMissing { commit: String, path: String },
    /// Could not acquire the repository lock within the timeout.
    #[error("could not acquire repository lock within timeout")]
    LockTimeout,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for Results in minigit.
pub type MinigitResult<T> = Result<T, MinigitError>;
