//! Content operations on the stamped directory: upload, delete by content
//! id, and pin state.
//!
//! A content id may name several files (until deduplication runs), so
//! delete removes all of them and pin checks that at least one exists.

use futures::future::join_all;
use stamp_client::{ContentStore, StoreError};
use stamp_core::{disambiguated_name, ContentEntry, ContentId};

use crate::dedup::remove_duplicates;
use crate::error::ContentError;

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Name of the file now holding the content. When identical bytes were
    /// already stored, this is the earlier file's name.
    pub full_name: String,
    /// Content id of the uploaded bytes.
    pub content_id: ContentId,
    /// Whether the new file was removed as a duplicate.
    pub deduplicated: bool,
}

/// Store `bytes` under a disambiguated form of `original_name`, then run a
/// deduplication pass before returning.
pub async fn upload(
    store: &dyn ContentStore,
    original_name: &str,
    bytes: Vec<u8>,
) -> Result<UploadOutcome, ContentError> {
    let name = disambiguated_name(original_name);
    let size = bytes.len();
    let entry = store.write(&name, bytes).await?;
    tracing::info!(name = %entry.name, cid = %entry.content_id, size, "file stored");

    let report = remove_duplicates(store).await?;
    let survivor = report
        .kept
        .iter()
        .find(|kept| kept.content_id == entry.content_id)
        .map(|kept| kept.name.clone())
        .unwrap_or_else(|| entry.name.clone());

    Ok(UploadOutcome {
        deduplicated: survivor != entry.name,
        full_name: survivor,
        content_id: entry.content_id,
    })
}

async fn files_with(store: &dyn ContentStore, cid: &ContentId) -> Result<Vec<ContentEntry>, ContentError> {
    let matching: Vec<ContentEntry> = store
        .list()
        .await?
        .into_iter()
        .filter(|e| e.is_file() && &e.content_id == cid)
        .collect();
    if matching.is_empty() {
        return Err(ContentError::NotFound(cid.clone()));
    }
    Ok(matching)
}

/// Remove every file with content id `cid`. Returns how many were removed.
///
/// All removals are attempted; the first failure is returned afterwards. A
/// file that vanished concurrently counts as removed.
pub async fn delete_by_content_id(
    store: &dyn ContentStore,
    cid: &ContentId,
) -> Result<usize, ContentError> {
    let victims = files_with(store, cid).await?;
    let results = join_all(victims.iter().map(|e| store.remove(&e.name))).await;

    let mut removed = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(()) | Err(StoreError::FileNotFound { .. }) => removed += 1,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e.into());
    }
    tracing::info!(cid = %cid, removed, "content deleted");
    Ok(removed)
}

/// Pin or unpin `cid`. The id must name a file in the stamped directory.
pub async fn set_pin(store: &dyn ContentStore, cid: &ContentId, pinned: bool) -> Result<(), ContentError> {
    files_with(store, cid).await?;
    if pinned {
        store.pin(cid).await?;
    } else {
        store.unpin(cid).await?;
    }
    tracing::info!(cid = %cid, pinned, "pin state changed");
    Ok(())
}
