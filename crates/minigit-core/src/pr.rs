//! Merge requests ("pull requests") between branches.
//!
//! Stored as a JSON array in `.minigit/prs.json`. Requests are only ever
//! appended or flipped from open to merged; ids are 1-based and never reused.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MinigitError, MinigitResult};
use crate::fsutil::atomic_write;

/// A merge request id, parsed from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrId(pub u32);

impl FromStr for PrId {
    type Err = MinigitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(PrId(n)),
            _ => Err(MinigitError::InvalidPrIdFormat(s.to_string())),
        }
    }
}

impl fmt::Display for PrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrStatus::Open => write!(f, "open"),
            PrStatus::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: PrId,
    pub source: String,
    pub target: String,
    pub status: PrStatus,
}

/// All merge requests in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrList {
    pub requests: Vec<MergeRequest>,
}

impl PrList {
    /// Load the list, or return an empty one when the file does not exist.
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

    /// Append an open request and return it.
    pub fn open(&mut self, source: &str, target: &str) -> &MergeRequest {
        let id = PrId(self.requests.len() as u32 + 1);
        self.requests.push(MergeRequest {
            id,
            source: source.to_string(),
            target: target.to_string(),
            status: PrStatus::Open,
        });
        &self.requests[self.requests.len() - 1]
    }

    /// Any request with this id, regardless of status.
    pub fn get(&self, id: PrId) -> MinigitResult<&MergeRequest> {
        self.requests
            .iter()
            .find(|pr| pr.id == id)
            .ok_or(MinigitError::PrNotFound(id.0))
    }

    /// An open request with this id.
    pub fn get_open_mut(&mut self, id: PrId) -> MinigitResult<&mut MergeRequest> {
        self.requests
            .iter_mut()
            .find(|pr| pr.id == id && pr.status == PrStatus::Open)
            .ok_or(MinigitError::PrNotFound(id.0))
    }
}
