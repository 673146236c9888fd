//! # Anchor Orchestrator
//!
//! Drives one `broadcast_cid` request through
//! `CheckExisting → Submit → Classify → Append`:
//!
//! | Ledger verdict | Result |
//! |----------------|--------|
//! | accepted | append `{cid, tx}`, [`AnchorState::Anchored`] |
//! | rejected: already registered | search for the tx, append it, [`AnchorState::Recovered`] |
//! | rejected: other | [`AnchorError::Rejected`] with the ledger's message |
//! | no verdict | [`AnchorError::Internal`] |
//!
//! The "already registered" path covers a crash between submit and append:
//! the retry finds the ledger already holds the anchor and records it
//! instead of failing. If the search cannot find the transaction, the empty
//! sentinel id is recorded and reconciliation upgrades it later.
//!
//! All steps for one content id run under that id's lock, so two requests
//! for the same id never both pass the existence check.

use std::sync::Arc;

use stamp_client::{BroadcastOutcome, RejectionKind};
use stamp_core::{ContentId, LedgerTxId, StampRecord};

use crate::error::AnchorError;
use crate::lock::KeyedLock;
use crate::Services;

/// What to do when the stamp log already holds a record for the id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingAnchorPolicy {
    /// Succeed and return the recorded transaction id.
    #[default]
    Idempotent,
    /// Fail with [`AnchorError::Conflict`].
    Reject,
}

/// Terminal success state of an anchoring request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    /// A new transaction was accepted and recorded.
    Anchored,
    /// The ledger already held an anchor; its id was recorded.
    Recovered,
    /// The stamp log already held a record; nothing was submitted.
    AlreadyAnchored,
}

impl AnchorState {
    /// Wire label shared by the HTTP response and the CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anchored => "anchored",
            Self::Recovered => "recovered",
            Self::AlreadyAnchored => "alreadyAnchored",
        }
    }
}

impl std::fmt::Display for AnchorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful anchoring request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorOutcome {
    /// The content id.
    pub content_id: ContentId,
    /// Transaction carrying the anchor. Empty when the ledger confirmed an
    /// anchor exists but its id could not be found.
    pub ledger_tx_id: LedgerTxId,
    /// How the request finished.
    pub state: AnchorState,
}

/// Coordinates ledger submission with the stamp log.
#[derive(Clone)]
pub struct AnchorOrchestrator {
    services: Services,
    locks: Arc<KeyedLock<ContentId>>,
    policy: ExistingAnchorPolicy,
}

impl AnchorOrchestrator {
    /// Create an orchestrator. `locks` must be shared with every other
    /// writer of the stamp log.
    pub fn new(
        services: Services,
        locks: Arc<KeyedLock<ContentId>>,
        policy: ExistingAnchorPolicy,
    ) -> Self {
        Self {
            services,
            locks,
            policy,
        }
    }

    /// Anchor `cid` on the ledger exactly once and record the proof.
    pub async fn broadcast_cid(&self, cid: &ContentId) -> Result<AnchorOutcome, AnchorError> {
        let _guard = self.locks.lock(cid).await;

        if let Some(existing) = self.services.log.find_by_content_id(cid).await? {
            return self.on_existing(cid, existing).await;
        }

        let outcome = self.services.ledger.broadcast(cid).await?;
        match outcome {
            BroadcastOutcome::Accepted { tx_id } => {
                self.record(cid, tx_id.clone()).await?;
                tracing::info!(cid = %cid, tx_id = %tx_id, "content id anchored");
                Ok(AnchorOutcome {
                    content_id: cid.clone(),
                    ledger_tx_id: tx_id,
                    state: AnchorState::Anchored,
                })
            }
            BroadcastOutcome::Rejected {
                kind: RejectionKind::AlreadyRegistered,
                message,
            } => {
                tracing::warn!(cid = %cid, %message, "content id already registered on the ledger, recovering");
                let tx_id = self.recover_tx_id(cid).await;
                self.record(cid, tx_id.clone()).await?;
                Ok(AnchorOutcome {
                    content_id: cid.clone(),
                    ledger_tx_id: tx_id,
                    state: AnchorState::Recovered,
                })
            }
            BroadcastOutcome::Rejected {
                kind: RejectionKind::Other,
                message,
            } => {
                tracing::warn!(cid = %cid, %message, "ledger rejected anchor");
                Err(AnchorError::Rejected { message })
            }
            BroadcastOutcome::Rejected {
                kind: RejectionKind::Unknown,
                message,
            } => {
                tracing::error!(cid = %cid, %message, "ledger returned no verdict for anchor");
                Err(AnchorError::Internal(message))
            }
        }
    }

    async fn on_existing(
        &self,
        cid: &ContentId,
        existing: StampRecord,
    ) -> Result<AnchorOutcome, AnchorError> {
        if self.policy == ExistingAnchorPolicy::Reject {
            return Err(AnchorError::Conflict {
                content_id: cid.clone(),
                existing: existing.ledger_tx_id,
            });
        }

        let mut tx_id = existing.ledger_tx_id;
        if tx_id.is_unknown() {
            // Upgrade a sentinel record if the ledger can now find the tx.
            if let Ok(found) = self.services.ledger.find_anchor_transaction_id(cid).await {
                self.record(cid, found.clone()).await?;
                tx_id = found;
            }
        }
        tracing::debug!(cid = %cid, tx_id = %tx_id, "content id already anchored");
        Ok(AnchorOutcome {
            content_id: cid.clone(),
            ledger_tx_id: tx_id,
            state: AnchorState::AlreadyAnchored,
        })
    }

    async fn recover_tx_id(&self, cid: &ContentId) -> LedgerTxId {
        match self.services.ledger.find_anchor_transaction_id(cid).await {
            Ok(tx_id) => tx_id,
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "anchor transaction not found, recording unknown id");
                LedgerTxId::unknown()
            }
        }
    }

    async fn record(&self, cid: &ContentId, tx_id: LedgerTxId) -> Result<(), AnchorError> {
        self.services
            .log
            .append(StampRecord::new(cid.clone(), tx_id.clone()))
            .await
            .map_err(|e| {
                tracing::error!(cid = %cid, tx_id = %tx_id, error = %e, "anchor not recorded in stamp log");
                AnchorError::Log(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stamp_client::{AnchorLedger, LedgerError, MemoryContentStore, MemoryLedger, MemoryStampLog, StampLog};

    struct Fixture {
        log: Arc<MemoryStampLog>,
        ledger: Arc<MemoryLedger>,
        orchestrator: AnchorOrchestrator,
    }

    #[test]
    fn state_labels_are_camel_case() {
        assert_eq!(AnchorState::Anchored.as_str(), "anchored");
        assert_eq!(AnchorState::Recovered.as_str(), "recovered");
        assert_eq!(AnchorState::AlreadyAnchored.to_string(), "alreadyAnchored");
    }

    async fn fixture(policy: ExistingAnchorPolicy) -> Fixture {
        let log = Arc::new(MemoryStampLog::new());
        let ledger = Arc::new(MemoryLedger::new());
        ledger.initialize().await.unwrap();
        let services = Services {
            store: Arc::new(MemoryContentStore::new("/stamped")),
            log: log.clone(),
            ledger: ledger.clone(),
        };
        Fixture {
            log,
            ledger,
            orchestrator: AnchorOrchestrator::new(services, Arc::new(KeyedLock::new()), policy),
        }
    }

    fn cid(s: &str) -> ContentId {
        ContentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn accepted_anchor_is_recorded() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        let outcome = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap();
        assert_eq!(outcome.state, AnchorState::Anchored);
        assert_eq!(Some(outcome.ledger_tx_id.clone()), f.ledger.anchor_of(&cid("bafy1")));

        let records = f.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ledger_tx_id, outcome.ledger_tx_id);
    }

    #[tokio::test]
    async fn already_registered_recovers_existing_tx() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.ledger.preload(cid("bafy1"), LedgerTxId::new("tx-prior"));

        let outcome = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap();
        assert_eq!(outcome.state, AnchorState::Recovered);
        assert_eq!(outcome.ledger_tx_id.as_str(), "tx-prior");

        let records = f.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ledger_tx_id.as_str(), "tx-prior");
    }

    #[tokio::test]
    async fn unrecoverable_tx_records_sentinel() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.ledger.preload(cid("bafy1"), LedgerTxId::new("tx-prior"));
        f.ledger.hide_from_search(cid("bafy1"));

        let outcome = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap();
        assert_eq!(outcome.state, AnchorState::Recovered);
        assert!(outcome.ledger_tx_id.is_unknown());
        assert!(f.log.records()[0].ledger_tx_id.is_unknown());
    }

    #[tokio::test]
    async fn existing_record_is_idempotent_success() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.log
            .append(StampRecord::new(cid("bafy1"), LedgerTxId::new("tx1")))
            .await
            .unwrap();

        let outcome = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap();
        assert_eq!(outcome.state, AnchorState::AlreadyAnchored);
        assert_eq!(outcome.ledger_tx_id.as_str(), "tx1");
        assert_eq!(f.ledger.submissions(), 0);
        assert_eq!(f.log.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn existing_record_conflicts_under_reject_policy() {
        let f = fixture(ExistingAnchorPolicy::Reject).await;
        f.log
            .append(StampRecord::new(cid("bafy1"), LedgerTxId::new("tx1")))
            .await
            .unwrap();

        let err = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap_err();
        assert!(matches!(err, AnchorError::Conflict { ref existing, .. } if existing.as_str() == "tx1"));
    }

    #[tokio::test]
    async fn sentinel_record_is_upgraded_when_found() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.ledger.preload(cid("bafy1"), LedgerTxId::new("tx-real"));
        f.log
            .append(StampRecord::new(cid("bafy1"), LedgerTxId::unknown()))
            .await
            .unwrap();

        let outcome = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap();
        assert_eq!(outcome.ledger_tx_id.as_str(), "tx-real");
        let latest = f.log.find_by_content_id(&cid("bafy1")).await.unwrap().unwrap();
        assert_eq!(latest.ledger_tx_id.as_str(), "tx-real");
    }

    #[tokio::test]
    async fn other_rejection_surfaces_ledger_message() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.ledger.force_rejection(RejectionKind::Other, "insufficient balance");

        let err = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap_err();
        assert!(matches!(err, AnchorError::Rejected { ref message } if message == "insufficient balance"));
        assert!(f.log.records().is_empty());
    }

    #[tokio::test]
    async fn missing_verdict_is_internal() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        f.ledger.force_rejection(RejectionKind::Unknown, "no verdict");

        let err = f.orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap_err();
        assert!(matches!(err, AnchorError::Internal(_)));
    }

    #[tokio::test]
    async fn uninitialized_ledger_is_a_ledger_error() {
        let log = Arc::new(MemoryStampLog::new());
        let services = Services {
            store: Arc::new(MemoryContentStore::new("/stamped")),
            log,
            ledger: Arc::new(MemoryLedger::new()),
        };
        let orchestrator = AnchorOrchestrator::new(services, Arc::new(KeyedLock::new()), ExistingAnchorPolicy::Idempotent);
        let err = orchestrator.broadcast_cid(&cid("bafy1")).await.unwrap_err();
        assert!(matches!(err, AnchorError::Ledger(LedgerError::NotInitialized)));
    }

    #[tokio::test]
    async fn concurrent_requests_for_one_cid_submit_once() {
        let f = fixture(ExistingAnchorPolicy::Idempotent).await;
        let orchestrator = f.orchestrator.clone();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let o = orchestrator.clone();
                tokio::spawn(async move { o.broadcast_cid(&ContentId::new("bafy1").unwrap()).await })
            })
            .collect();
        let mut tx_ids = Vec::new();
        for h in handles {
            tx_ids.push(h.await.unwrap().unwrap().ledger_tx_id);
        }

        assert_eq!(f.ledger.submissions(), 1);
        assert_eq!(f.log.records().len(), 1);
        assert!(tx_ids.iter().all(|t| *t == tx_ids[0]));
    }
}
