//! Repository configuration stored at `.minigit/config.json`.
//!
//! Every field is serde-defaulted, so a missing file or a file written by an
//! older version loads cleanly.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MinigitResult;
use crate::fsutil::atomic_write;

/// How checkout, revert and reset bring the working directory in line with
/// a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Overwrite the files listed in the target commit; leave everything
    /// else on disk untouched.
    #[default]
    Partial,
    /// Like `Partial`, and also delete files that the previous tip tracked
    /// but the target commit does not.
    Clean,
}

/// Limits applied when rendering diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Unchanged lines shown around each change.
    pub context_lines: usize,
    /// Lines previewed for a wholly added or removed file.
    pub preview_lines: usize,
    /// Rendered unified-diff lines kept per changed file.
    pub max_lines: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            preview_lines: 5,
            max_lines: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// The branch created by `init`; it can never be deleted.
    pub default_branch: String,
    pub sync_mode: SyncMode,
    pub diff: DiffConfig,
    /// How long mutating operations wait for the repository lock.
    pub lock_timeout_ms: u64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            sync_mode: SyncMode::default(),
            diff: DiffConfig::default(),
            lock_timeout_ms: 5_000,
        }
    }
}

impl RepoConfig {
    /// Load the config, or return defaults when the file does not exist.
    pub fn load(path: &Path) -> MinigitResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> MinigitResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
