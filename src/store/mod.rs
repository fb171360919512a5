//! Versioned persistence of thread checkpoints.
//!
//! Every save names the version it expects to replace, so two processes
//! racing on the same thread cannot silently overwrite each other.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::workflow::Checkpoint;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keyed, versioned storage of thread checkpoints
#[async_trait]
pub trait ThreadStore: Send + Sync + fmt::Debug {
    /// Load the latest checkpoint of a thread
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Save a checkpoint if the stored version still equals `expected`.
    ///
    /// `None` means the thread must not exist yet. Returns the committed
    /// version; a mismatch fails with [`crate::Error::VersionConflict`].
    async fn save(&self, checkpoint: &Checkpoint, expected: Option<u64>) -> Result<u64>;

    /// Ids of every stored thread, sorted
    async fn list(&self) -> Result<Vec<String>>;
}

/// Version a save with the given precondition commits
pub(crate) fn next_version(expected: Option<u64>) -> u64 {
    expected.map_or(1, |v| v.saturating_add(1))
}
