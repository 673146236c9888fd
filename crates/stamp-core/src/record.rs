//! # Records and Views
//!
//! - [`ContentEntry`]: one file listed in the stamped directory.
//! - [`StampRecord`]: one line of the append-only stamp log.
//! - [`StampedFileView`]: the projection served by `GET /content/items`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::{ContentId, LedgerTxId};

/// A file in the content store's stamped directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    /// Stored name, including the disambiguating prefix.
    pub name: String,
    /// Content identifier of the file's bytes.
    pub content_id: ContentId,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Directories are listed by the store but excluded from all processing.
    pub is_directory: bool,
}

impl ContentEntry {
    /// Whether this entry is a regular file.
    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// One entry in the stamp log: a content id anchored by a ledger transaction.
///
/// Field aliases accept records written by earlier deployments
/// (`ipfsCid` / `arkTransactionId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampRecord {
    /// The anchored content identifier.
    #[serde(alias = "ipfsCid")]
    pub content_id: ContentId,
    /// Transaction carrying the anchor. Empty when unknown.
    #[serde(alias = "arkTransactionId", default)]
    pub ledger_tx_id: LedgerTxId,
    /// When this record was appended. Absent on legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl StampRecord {
    /// Create a record stamped with the current time.
    pub fn new(content_id: ContentId, ledger_tx_id: LedgerTxId) -> Self {
        Self {
            content_id,
            ledger_tx_id,
            recorded_at: Some(Utc::now()),
        }
    }
}

/// Stamp details included in a [`StampedFileView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StampInfo {
    /// Ledger transaction id. Empty when the anchor exists but its id is unknown.
    #[schema(value_type = String)]
    pub ledger_tx_id: LedgerTxId,
    /// Link to the transaction on the ledger explorer. Omitted for the empty sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
}

/// Composed projection of a stamped file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StampedFileView {
    /// Content identifier.
    #[schema(value_type = String)]
    pub content_id: ContentId,
    /// Stored name of the first listed file with this content id.
    pub full_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Size in megabytes, rounded to two decimals.
    pub size_megabytes: f64,
    /// Whether the content id is in the store's pin set.
    pub pinned: bool,
    /// Present when the stamp log holds a record for this content id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamped: Option<StampInfo>,
}

impl StampedFileView {
    /// Build the view for an entry. `stamped` is the latest record's info, if any.
    pub fn from_entry(entry: &ContentEntry, pinned: bool, stamped: Option<StampInfo>) -> Self {
        Self {
            content_id: entry.content_id.clone(),
            full_name: entry.name.clone(),
            size_bytes: entry.size_bytes,
            size_megabytes: megabytes(entry.size_bytes),
            pinned,
            stamped,
        }
    }
}

/// Bytes to megabytes, rounded to two decimals.
fn megabytes(bytes: u64) -> f64 {
    let mb = bytes as f64 / 1024.0 / 1024.0;
    (mb * 100.0).round() / 100.0
}
