//! # Reconciliation Engine
//!
//! Repairs the stamp log from ledger truth. Every content id in the store
//! whose log record is missing (or holds only the unknown sentinel) is
//! searched on the ledger; ids the ledger knows are appended.
//!
//! Searches run in batches of [`BATCH_SIZE`]. Members of a batch run
//! concurrently and batches run one after another, so at most
//! `BATCH_SIZE` ledger queries are in flight.
//!
//! A failed search or append skips that id; it stays unreconciled until
//! the next run. Only an unreadable store listing or stamp log aborts.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use stamp_client::LedgerError;
use stamp_core::{ContentId, StampRecord};

use crate::error::SyncError;
use crate::lock::KeyedLock;
use crate::view::latest_records;
use crate::Services;

/// Ledger searches in flight per batch.
pub const BATCH_SIZE: usize = 3;

/// Result of one synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Store content ids missing from the log.
    pub attempted: usize,
    /// Ids appended to the log in this run.
    pub reconciled: usize,
    /// Ids left unreconciled (not on the ledger, or a failure).
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Reconciled,
    Skipped,
}

/// Rebuilds missing stamp records from the ledger.
#[derive(Clone)]
pub struct Reconciler {
    services: Services,
    locks: Arc<KeyedLock<ContentId>>,
}

impl Reconciler {
    /// Create a reconciler sharing `locks` with the anchor orchestrator.
    pub fn new(services: Services, locks: Arc<KeyedLock<ContentId>>) -> Self {
        Self { services, locks }
    }

    /// Content ids in the store that lack a usable stamp record, in
    /// listing order.
    pub async fn missing_content_ids(&self) -> Result<Vec<ContentId>, SyncError> {
        let entries = self.services.store.list().await?;
        let latest = latest_records(self.services.log.snapshot().await?);

        let mut seen = HashSet::new();
        Ok(entries
            .into_iter()
            .filter(|e| e.is_file())
            .map(|e| e.content_id)
            .filter(|cid| seen.insert(cid.clone()))
            .filter(|cid| latest.get(cid).map_or(true, |r| r.ledger_tx_id.is_unknown()))
            .collect())
    }

    /// Diff the store against the log and append every anchor the ledger
    /// can supply.
    pub async fn synchronize_log(&self) -> Result<SyncReport, SyncError> {
        let missing = self.missing_content_ids().await?;
        let mut report = SyncReport {
            attempted: missing.len(),
            ..SyncReport::default()
        };
        tracing::info!(missing = missing.len(), "synchronizing stamp log");

        for batch in missing.chunks(BATCH_SIZE) {
            let outcomes = join_all(batch.iter().map(|cid| self.reconcile_one(cid))).await;
            for outcome in outcomes {
                match outcome {
                    ItemOutcome::Reconciled => report.reconciled += 1,
                    ItemOutcome::Skipped => report.skipped += 1,
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            reconciled = report.reconciled,
            skipped = report.skipped,
            "stamp log synchronized"
        );
        Ok(report)
    }

    async fn reconcile_one(&self, cid: &ContentId) -> ItemOutcome {
        let tx_id = match self.services.ledger.find_anchor_transaction_id(cid).await {
            Ok(tx_id) => tx_id,
            Err(LedgerError::NotFound(_)) => {
                tracing::debug!(cid = %cid, "no anchor on the ledger");
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "ledger search failed, skipping");
                return ItemOutcome::Skipped;
            }
        };

        let _guard = self.locks.lock(cid).await;
        // An anchor request may have recorded this id while we searched.
        match self.services.log.find_by_content_id(cid).await {
            Ok(Some(record)) if !record.ledger_tx_id.is_unknown() => return ItemOutcome::Skipped,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "stamp log read failed, skipping");
                return ItemOutcome::Skipped;
            }
        }

        match self
            .services
            .log
            .append(StampRecord::new(cid.clone(), tx_id.clone()))
            .await
        {
            Ok(()) => {
                tracing::info!(cid = %cid, tx_id = %tx_id, "stamp record reconciled");
                ItemOutcome::Reconciled
            }
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "stamp log append failed, skipping");
                ItemOutcome::Skipped
            }
        }
    }
}
