//! Projection of the stamped directory for display.
//!
//! Joins the listing, the pin set and the latest stamp record per content
//! id into [`StampedFileView`]s. One view per content id: the first file
//! in listing order names it. Nothing here is persisted.

use std::collections::{HashMap, HashSet};

use stamp_client::{AnchorLedger, ContentStore, StampLog};
use stamp_core::{ContentEntry, ContentId, StampInfo, StampRecord, StampedFileView};

use crate::error::ContentError;

/// Latest record per content id from a most-recent-first snapshot.
pub fn latest_records(snapshot: Vec<StampRecord>) -> HashMap<ContentId, StampRecord> {
    let mut latest = HashMap::new();
    for record in snapshot {
        latest.entry(record.content_id.clone()).or_insert(record);
    }
    latest
}

/// Build one view per distinct content id, in listing order.
pub fn build_views(
    entries: &[ContentEntry],
    pins: &HashSet<ContentId>,
    latest: &HashMap<ContentId, StampRecord>,
    ledger: &dyn AnchorLedger,
) -> Vec<StampedFileView> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| e.is_file())
        .filter(|e| seen.insert(&e.content_id))
        .map(|entry| {
            let stamped = latest.get(&entry.content_id).map(|record| StampInfo {
                ledger_tx_id: record.ledger_tx_id.clone(),
                explorer_link: ledger.explorer_link(&record.ledger_tx_id),
            });
            StampedFileView::from_entry(entry, pins.contains(&entry.content_id), stamped)
        })
        .collect()
}

/// Read the store, pin set and stamp log and build the projection.
pub async fn list_stamped_files(
    store: &dyn ContentStore,
    log: &dyn StampLog,
    ledger: &dyn AnchorLedger,
) -> Result<Vec<StampedFileView>, ListError> {
    let entries = store.list().await?;
    let pins = store.list_pinned().await?;
    let latest = latest_records(log.snapshot().await?);
    Ok(build_views(&entries, &pins, &latest, ledger))
}

/// Failure reading one of the projection's sources.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// Listing or pin set unavailable.
    #[error(transparent)]
    Store(#[from] stamp_client::StoreError),
    /// Stamp log unavailable.
    #[error(transparent)]
    Log(#[from] stamp_client::LogError),
}

impl From<ListError> for ContentError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Store(e) => ContentError::Store(e),
            ListError::Log(e) => ContentError::Log(e),
        }
    }
}
