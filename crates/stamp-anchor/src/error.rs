//! Workflow errors.
//!
//! Collaborator errors pass through unchanged inside these enums. The only
//! ledger condition absorbed rather than surfaced is "already registered",
//! which the orchestrator turns into a recovered anchor.

use stamp_client::{LedgerError, LogError, StoreError};
use stamp_core::{ContentId, LedgerTxId};
use thiserror::Error;

/// Errors from [`AnchorOrchestrator::broadcast_cid`](crate::AnchorOrchestrator::broadcast_cid).
#[derive(Error, Debug)]
pub enum AnchorError {
    /// The content id already has a stamp record and the policy rejects
    /// repeat requests.
    #[error("content id {content_id} is already anchored")]
    Conflict {
        /// The requested content id.
        content_id: ContentId,
        /// Transaction id of the existing record.
        existing: LedgerTxId,
    },

    /// The ledger refused the transaction for a reason other than a prior
    /// registration.
    #[error("ledger rejected anchor: {message}")]
    Rejected {
        /// The ledger's own message.
        message: String,
    },

    /// The ledger neither accepted the transaction nor explained why.
    #[error("anchor failed: {0}")]
    Internal(String),

    /// Ledger transport, decoding or lifecycle failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Stamp log failure.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Fatal failures of [`Reconciler::synchronize_log`](crate::Reconciler::synchronize_log).
///
/// Per-item ledger and append failures are not errors; they are counted as
/// skipped.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The store listing could not be read.
    #[error("cannot list the content store: {0}")]
    Store(#[from] StoreError),

    /// The stamp log could not be read.
    #[error("cannot read the stamp log: {0}")]
    Log(#[from] LogError),
}

/// Fatal failures of [`remove_duplicates`](crate::dedup::remove_duplicates).
#[derive(Error, Debug)]
pub enum DedupError {
    /// The store listing could not be read.
    #[error("cannot list the content store: {0}")]
    Store(#[from] StoreError),
}

/// Errors from content operations (list, upload, delete, pin).
#[derive(Error, Debug)]
pub enum ContentError {
    /// No file in the stamped directory has this content id.
    #[error("the file having the content id \"{0}\" was not found in the stamped directory")]
    NotFound(ContentId),

    /// Content store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stamp log failure.
    #[error(transparent)]
    Log(#[from] LogError),

    /// The post-upload deduplication pass could not list the store.
    #[error(transparent)]
    Dedup(#[from] DedupError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_names_cid() {
        let err = AnchorError::Conflict {
            content_id: ContentId::new("bafy1").unwrap(),
            existing: LedgerTxId::new("tx1"),
        };
        assert_eq!(format!("{err}"), "content id bafy1 is already anchored");
    }

    #[test]
    fn not_found_display_matches_delete_message() {
        let err = ContentError::NotFound(ContentId::new("bafy1").unwrap());
        assert!(format!("{err}").contains("\"bafy1\" was not found"));
    }

    #[test]
    fn ledger_errors_pass_through() {
        let err: AnchorError = LedgerError::NotInitialized.into();
        assert!(matches!(err, AnchorError::Ledger(LedgerError::NotInitialized)));
    }
}
