//! Repository locking.
//!
//! Every mutating operation holds an advisory exclusive lock on
//! `.minigit/minigit.lock` (`flock(2)` on Unix) via the `fs2` crate. The OS
//! releases the lock when the process dies, so there is no stale-lock
//! bookkeeping.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{MinigitError, MinigitResult};

/// Name of the lock file inside `.minigit/`.
pub const LOCK_FILE: &str = "minigit.lock";

/// An exclusive repository lock, released on drop.
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Acquire an exclusive lock on the repository.
    ///
    /// Polls until the lock is acquired or `timeout` expires, in which case
    /// `MinigitError::LockTimeout` is returned.
    pub fn acquire(minigit_dir: &Path, timeout: Duration) -> MinigitResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(minigit_dir.join(LOCK_FILE))?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RepoLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(MinigitError::LockTimeout);
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}
