//! Snapshot store.
//!
//! Each commit owns one directory under `.minigit/commits/<id>/` holding a
//! byte-exact copy of every file the commit lists, at the same relative
//! path. Snapshots are written once: files are copied into a temporary
//! `.tmp-<id>` directory which is renamed into place only when complete.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{MinigitError, MinigitResult};
use crate::fsutil::copy_file;
use crate::hash::hash_bytes;

const TEMP_PREFIX: &str = ".tmp-";

pub struct SnapshotStore {
    /// Root path: `.minigit/commits/`
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(commits_dir: &Path) -> Self {
        Self {
            root: commits_dir.to_path_buf(),
        }
    }

    pub fn exists(&self, commit_id: &str) -> bool {
        self.dir(commit_id).is_dir()
    }

    /// Directory holding a commit's snapshot.
    pub fn dir(&self, commit_id: &str) -> PathBuf {
        self.root.join(commit_id)
    }

    /// Location of one file inside a commit's snapshot.
    pub fn file_path(&self, commit_id: &str, rel_path: &str) -> PathBuf {
        self.dir(commit_id).join(rel_path)
    }

    /// Create the snapshot for `commit_id` from `(relative path, source file)`
    /// pairs. Fails without leaving a snapshot behind if any copy fails.
    pub fn create(&self, commit_id: &str, files: &[(String, PathBuf)]) -> MinigitResult<()> {
        let tmp = self.root.join(format!("{TEMP_PREFIX}{commit_id}"));
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }
        fs::create_dir_all(&tmp)?;

        let copied = files
            .iter()
            .try_for_each(|(rel, src)| copy_file(src, &tmp.join(rel)));
        if let Err(e) = copied {
            let _ = fs::remove_dir_all(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, self.dir(commit_id))?;
        debug!("wrote snapshot {commit_id} ({} file(s))", files.len());
        Ok(())
    }

    /// Read one file out of a snapshot.
    pub fn read(&self, commit_id: &str, rel_path: &str) -> MinigitResult<Vec<u8>> {
        let path = self.file_path(commit_id, rel_path);
        if !path.is_file() {
            return Err(MinigitError::SnapshotMissing {
                commit: commit_id.to_string(),
                path: rel_path.to_string(),
            });
        }
        Ok(fs::read(&path)?)
    }

    /// Content hash of a snapshot file, or None if the snapshot lacks it.
    pub fn hash_of(&self, commit_id: &str, rel_path: &str) -> MinigitResult<Option<String>> {
        let path = self.file_path(commit_id, rel_path);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(hash_bytes(&fs::read(&path)?)))
    }

    /// Fail with `SnapshotMissing` unless every listed file is present.
    pub fn verify(&self, commit_id: &str, files: &[String]) -> MinigitResult<()> {
        match files
            .iter()
            .find(|f| !self.file_path(commit_id, f).is_file())
        {
            Some(missing) => Err(MinigitError::SnapshotMissing {
                commit: commit_id.to_string(),
                path: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Copy the listed snapshot files over their working-directory
    /// counterparts. Returns the paths written.
    pub fn restore(
        &self,
        commit_id: &str,
        files: &[String],
        work_root: &Path,
    ) -> MinigitResult<Vec<String>> {
        self.verify(commit_id, files)?;
        for rel in files {
            copy_file(&self.file_path(commit_id, rel), &work_root.join(rel))?;
        }
        Ok(files.to_vec())
    }

    /// Remove temporary directories left by an interrupted commit.
    pub fn sweep_temp(&self) -> MinigitResult<usize> {
        let mut removed = 0;
        if !self.root.exists() {
            return Ok(0);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                warn!("removing orphaned snapshot directory {name}");
                fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
