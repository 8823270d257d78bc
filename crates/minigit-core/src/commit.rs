//! Commit records.
//!
//! A commit names a snapshot (`.minigit/commits/<id>/`) and lists exactly the
//! files stored in it. Commits are immutable once appended to a branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::IdHasher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Short hex id, also the snapshot directory name.
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Repository-relative paths stored in the snapshot, in staging order.
    pub files: Vec<String>,
}

/// Everything that feeds into a commit id.
///
/// The id covers the parent, the message, the commit instant and every
/// staged path together with its content hash, so two commits only share
/// an id if all of those coincide *and* the truncated digests collide. The
/// caller bumps `nonce` until the id is unused.
pub struct IdSeed<'a> {
    pub parent: Option<&'a str>,
    pub message: &'a str,
    pub timestamp: DateTime<Utc>,
    /// `(path, content hash)` pairs in staging order.
    pub contents: &'a [(String, String)],
    pub nonce: u32,
}

impl IdSeed<'_> {
    pub fn derive(&self) -> String {
        let mut hasher = IdHasher::new()
            .field(self.parent.unwrap_or_default().as_bytes())
            .field(self.message.as_bytes())
            .field(self.timestamp.to_rfc3339().as_bytes());
        for (path, hash) in self.contents {
            hasher = hasher.field(path.as_bytes()).field(hash.as_bytes());
        }
        hasher.field(&self.nonce.to_le_bytes()).short_id()
    }
}

impl Commit {
    /// One-line summary used by `log --format brief` and status output.
    pub fn headline(&self) -> String {
        format!("{} {}", self.id, self.message)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}
