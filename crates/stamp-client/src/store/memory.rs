//! In-process content store.
//!
//! Content ids are derived from the SHA-256 of the bytes, so identical
//! bytes always share an id. Listing order is insertion order. Failure
//! injection hooks let tests exercise partial-failure paths.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use stamp_core::{ContentEntry, ContentId};

use super::{ContentStore, StoreVersion};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    directory_exists: bool,
    directory_is_file: bool,
    entries: Vec<ContentEntry>,
    pins: HashSet<ContentId>,
    failing_removals: HashSet<String>,
    unavailable: bool,
}

/// Content store held in memory.
#[derive(Debug)]
pub struct MemoryContentStore {
    directory: String,
    inner: Mutex<Inner>,
}

impl MemoryContentStore {
    /// Create an empty store whose stamped directory does not exist yet.
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Content id for `bytes`: `bafk` followed by the hex SHA-256.
    pub fn content_id_for(bytes: &[u8]) -> ContentId {
        let id = format!("bafk{}", hex::encode(Sha256::digest(bytes)));
        // Always alphanumeric and 68 characters long.
        ContentId::new(id).unwrap_or_else(|_| unreachable!("hex digest is a valid content id"))
    }

    /// Make the stamped path exist as a regular file.
    pub fn occupy_directory_path_with_file(&self) {
        let mut inner = self.inner.lock();
        inner.directory_exists = true;
        inner.directory_is_file = true;
    }

    /// Seed an entry with an explicit content id, bypassing hashing.
    pub fn insert_entry(&self, name: &str, content_id: ContentId, size_bytes: u64) {
        let mut inner = self.inner.lock();
        inner.directory_exists = true;
        inner.entries.push(ContentEntry {
            name: name.to_string(),
            content_id,
            size_bytes,
            is_directory: false,
        });
    }

    /// Seed a subdirectory entry.
    pub fn insert_directory(&self, name: &str, content_id: ContentId) {
        let mut inner = self.inner.lock();
        inner.directory_exists = true;
        inner.entries.push(ContentEntry {
            name: name.to_string(),
            content_id,
            size_bytes: 0,
            is_directory: true,
        });
    }

    /// Make every later `remove(name)` fail.
    pub fn fail_removal_of(&self, name: &str) {
        self.inner.lock().failing_removals.insert(name.to_string());
    }

    /// Make every call fail as if the node were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Snapshot of stored names, in listing order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    fn check_available(inner: &Inner, endpoint: &str) -> Result<(), StoreError> {
        if inner.unavailable {
            return Err(StoreError::Api {
                endpoint: endpoint.to_string(),
                status: 503,
                message: "content store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn directory(&self) -> &str {
        &self.directory
    }

    async fn version(&self) -> Result<StoreVersion, StoreError> {
        let inner = self.inner.lock();
        Self::check_available(&inner, "version")?;
        Ok(StoreVersion {
            version: "memory".to_string(),
            ..StoreVersion::default()
        })
    }

    async fn ensure_directory(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check_available(&inner, "files/stat")?;
        if inner.directory_is_file {
            return Err(StoreError::DirectoryConflict {
                path: self.directory.clone(),
            });
        }
        inner.directory_exists = true;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ContentEntry>, StoreError> {
        let inner = self.inner.lock();
        Self::check_available(&inner, "files/ls")?;
        if !inner.directory_exists {
            return Err(StoreError::Api {
                endpoint: "files/ls".to_string(),
                status: 500,
                message: "file does not exist".to_string(),
            });
        }
        Ok(inner.entries.clone())
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ContentEntry, StoreError> {
        let mut inner = self.inner.lock();
        Self::check_available(&inner, "files/write")?;
        let entry = ContentEntry {
            name: name.to_string(),
            content_id: Self::content_id_for(&bytes),
            size_bytes: bytes.len() as u64,
            is_directory: false,
        };
        inner.directory_exists = true;
        inner.entries.retain(|e| e.name != name);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check_available(&inner, "files/rm")?;
        if inner.failing_removals.contains(name) {
            return Err(StoreError::Api {
                endpoint: "files/rm".to_string(),
                status: 500,
                message: format!("injected failure removing {name}"),
            });
        }
        let before = inner.entries.len();
        inner.entries.retain(|e| e.name != name);
        if inner.entries.len() == before {
            return Err(StoreError::FileNotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn pin(&self, cid: &ContentId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check_available(&inner, "pin/add")?;
        inner.pins.insert(cid.clone());
        Ok(())
    }

    async fn unpin(&self, cid: &ContentId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check_available(&inner, "pin/rm")?;
        if !inner.pins.remove(cid) {
            return Err(StoreError::Api {
                endpoint: "pin/rm".to_string(),
                status: 500,
                message: "not pinned or pinned indirectly".to_string(),
            });
        }
        Ok(())
    }

    async fn list_pinned(&self) -> Result<HashSet<ContentId>, StoreError> {
        let inner = self.inner.lock();
        Self::check_available(&inner, "pin/ls")?;
        Ok(inner.pins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_a_content_id() {
        let a = MemoryContentStore::content_id_for(b"hello");
        let b = MemoryContentStore::content_id_for(b"hello");
        let c = MemoryContentStore::content_id_for(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 68);
    }

    #[tokio::test]
    async fn ensure_directory_is_idempotent() {
        let store = MemoryContentStore::new("/stamped");
        store.ensure_directory().await.unwrap();
        store.ensure_directory().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_directory_conflicts_with_file() {
        let store = MemoryContentStore::new("/stamped");
        store.occupy_directory_path_with_file();
        assert!(matches!(
            store.ensure_directory().await,
            Err(StoreError::DirectoryConflict { .. })
        ));
    }

    #[tokio::test]
    async fn write_is_visible_to_list() {
        let store = MemoryContentStore::new("/stamped");
        let entry = store.write("a_doc.txt", b"bytes".to_vec()).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![entry]);
    }

    #[tokio::test]
    async fn remove_missing_file_is_not_found() {
        let store = MemoryContentStore::new("/stamped");
        store.ensure_directory().await.unwrap();
        assert!(matches!(
            store.remove("nope").await,
            Err(StoreError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn pin_then_unpin_restores_pin_set() {
        let store = MemoryContentStore::new("/stamped");
        let cid = ContentId::new("bafy1").unwrap();
        store.pin(&cid).await.unwrap();
        assert!(store.list_pinned().await.unwrap().contains(&cid));
        store.unpin(&cid).await.unwrap();
        assert!(!store.list_pinned().await.unwrap().contains(&cid));
    }
}
