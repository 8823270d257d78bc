//! Content hashing using SHA-256.

use sha2::{Digest, Sha256};

/// Length of the abbreviated commit ids handed out to users.
pub const SHORT_ID_LEN: usize = 7;

/// Compute the SHA-256 hash of arbitrary bytes, returned as a hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Incremental hasher for ids built from several fields.
///
/// Each field is length-prefixed so `("ab", "c")` and `("a", "bc")` never
/// produce the same digest.
#[derive(Default)]
pub struct IdHasher {
    inner: Sha256,
}

impl IdHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, data: &[u8]) -> Self {
        self.inner.update((data.len() as u64).to_le_bytes());
        self.inner.update(data);
        self
    }

    /// Finish and truncate to [`SHORT_ID_LEN`] hex characters.
    pub fn short_id(self) -> String {
        let mut hex = hex::encode(self.inner.finalize());
        hex.truncate(SHORT_ID_LEN);
        hex
    }
}
