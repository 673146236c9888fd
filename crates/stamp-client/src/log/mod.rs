//! # Stamp Log
//!
//! Append-only, ordered log of [`StampRecord`]s. Records are never edited or
//! deleted; a correction is a newer record for the same content id, and
//! readers resolve duplicates with "most recent wins".
//!
//! Implementations:
//! - [`FileStampLog`]: JSON Lines file, replayed on open, fsynced per append.
//! - [`MemoryStampLog`]: in-process log for tests.

mod file;
mod memory;

pub use file::FileStampLog;
pub use memory::MemoryStampLog;

use async_trait::async_trait;
use stamp_core::{ContentId, StampRecord};

use crate::error::LogError;

/// Ordered, appendable, iterable log of stamp records.
#[async_trait]
pub trait StampLog: Send + Sync {
    /// Durably append `record`. Once this returns, every later read in this
    /// process observes it.
    async fn append(&self, record: StampRecord) -> Result<(), LogError>;

    /// All records, most recent first.
    async fn snapshot(&self) -> Result<Vec<StampRecord>, LogError>;

    /// Most recent record for `cid`, if any.
    async fn find_by_content_id(&self, cid: &ContentId) -> Result<Option<StampRecord>, LogError> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .find(|r| &r.content_id == cid))
    }

    /// Number of records, duplicates included.
    async fn len(&self) -> Result<usize, LogError> {
        Ok(self.snapshot().await?.len())
    }

    /// Whether the log holds no records.
    async fn is_empty(&self) -> Result<bool, LogError> {
        Ok(self.len().await? == 0)
    }
}
