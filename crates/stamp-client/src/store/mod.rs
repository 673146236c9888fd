//! # Content Store Adapter
//!
//! The [`ContentStore`] capability wraps a content-addressed file store
//! scoped to one logical directory (the "stamped" directory). Pins are
//! global to the store: pinning a content id affects every file sharing it.
//!
//! Implementations:
//! - [`IpfsContentStore`]: Kubo-compatible RPC API over HTTP.
//! - [`MemoryContentStore`]: in-process store for tests and local runs.
//!
//! No caching: every `list` reflects all completed writes and removals.

mod ipfs;
mod memory;

pub use ipfs::IpfsContentStore;
pub use memory::MemoryContentStore;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stamp_core::{ContentEntry, ContentId};

use crate::error::StoreError;

/// Version information reported by the content store node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreVersion {
    #[serde(alias = "Version", default)]
    pub version: String,
    #[serde(alias = "Commit", default)]
    pub commit: String,
    #[serde(alias = "Repo", default)]
    pub repo: String,
    #[serde(alias = "System", default)]
    pub system: String,
    #[serde(alias = "Golang", default)]
    pub golang: String,
}

/// Narrow capability over the content-addressed store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The logical directory this adapter operates on.
    fn directory(&self) -> &str;

    /// Version information of the store node.
    async fn version(&self) -> Result<StoreVersion, StoreError>;

    /// Create the stamped directory if missing.
    ///
    /// Fails with [`StoreError::DirectoryConflict`] if the path exists but is
    /// not a directory. Idempotent otherwise.
    async fn ensure_directory(&self) -> Result<(), StoreError>;

    /// List the stamped directory in store order. Directories are included
    /// and flagged; callers filter them.
    async fn list(&self) -> Result<Vec<ContentEntry>, StoreError>;

    /// Write `bytes` under `name` in the stamped directory and return the
    /// resulting entry. `name` is used verbatim; callers add the prefix.
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ContentEntry, StoreError>;

    /// Remove the file `name` from the stamped directory.
    async fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Add `cid` to the global pin set.
    async fn pin(&self, cid: &ContentId) -> Result<(), StoreError>;

    /// Remove `cid` from the global pin set.
    async fn unpin(&self, cid: &ContentId) -> Result<(), StoreError>;

    /// The global pin set.
    async fn list_pinned(&self) -> Result<HashSet<ContentId>, StoreError>;
}
