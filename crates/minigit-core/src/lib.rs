//! minigit-core — Core library for a minimal snapshot-based version control
//! system.
//!
//! Every commit is a full copy of the files it captured, stored under
//! `.minigit/commits/<id>/`. Branches are ordered lists of commit records
//! kept in a single JSON state document, and branches are combined through
//! lightweight merge requests that append missing commits.

pub mod commit;
pub mod config;
pub mod diff;
pub mod error;
pub mod fsutil;
pub mod hash;
pub mod index;
pub mod lock;
pub mod pr;
pub mod repo;
pub mod snapshot;
pub mod state;

pub use error::{MinigitError, MinigitResult};
pub use repo::Repository;
