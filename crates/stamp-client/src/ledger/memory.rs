//! In-process ledger.
//!
//! Anchors are keyed by content id, so a second broadcast for an anchored
//! id is rejected as already registered, matching a real ledger's asset
//! uniqueness rule. Hooks inject search failures, forced rejections and
//! search latency.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use stamp_core::{ContentId, LedgerTxId};

use super::{AnchorLedger, BroadcastOutcome, NetworkParameters, RejectionKind};
use crate::error::LedgerError;

const ALREADY_REGISTERED: &str =
    "Failed to apply transaction, because this IPFS hash is already registered on the blockchain.";

#[derive(Debug, Default)]
struct State {
    anchors: HashMap<ContentId, LedgerTxId>,
    hidden_from_search: HashSet<ContentId>,
    failing_searches: HashSet<ContentId>,
    forced_rejection: Option<(RejectionKind, String)>,
    submissions: usize,
}

/// Ledger held in memory.
#[derive(Debug)]
pub struct MemoryLedger {
    explorer_base: url::Url,
    initialized: AtomicBool,
    state: Mutex<State>,
    search_delay: Mutex<Option<Duration>>,
    searches_in_flight: AtomicUsize,
    max_searches_in_flight: AtomicUsize,
    searches: AtomicUsize,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create an empty, uninitialized ledger.
    pub fn new() -> Self {
        let explorer_base = url::Url::parse("https://explorer.test")
            .unwrap_or_else(|_| unreachable!("static URL parses"));
        Self {
            explorer_base,
            initialized: AtomicBool::new(false),
            state: Mutex::new(State::default()),
            search_delay: Mutex::new(None),
            searches_in_flight: AtomicUsize::new(0),
            max_searches_in_flight: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
        }
    }

    /// Record an anchor for `cid` as if submitted by an earlier run.
    pub fn preload(&self, cid: ContentId, tx_id: LedgerTxId) {
        self.state.lock().anchors.insert(cid, tx_id);
    }

    /// Keep `cid` anchored but make searches for it return `NotFound`.
    pub fn hide_from_search(&self, cid: ContentId) {
        self.state.lock().hidden_from_search.insert(cid);
    }

    /// Make searches for `cid` fail with an API error.
    pub fn fail_search(&self, cid: ContentId) {
        self.state.lock().failing_searches.insert(cid);
    }

    /// Reject every later broadcast with `kind` and `message`.
    pub fn force_rejection(&self, kind: RejectionKind, message: impl Into<String>) {
        self.state.lock().forced_rejection = Some((kind, message.into()));
    }

    /// Delay every search by `delay` so concurrent lookups overlap.
    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock() = Some(delay);
    }

    /// Transactions submitted so far, accepted or not.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Searches performed so far.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Highest number of searches observed running at once.
    pub fn max_concurrent_searches(&self) -> usize {
        self.max_searches_in_flight.load(Ordering::SeqCst)
    }

    /// Anchored transaction id for `cid`, bypassing search hooks.
    pub fn anchor_of(&self, cid: &ContentId) -> Option<LedgerTxId> {
        self.state.lock().anchors.get(cid).cloned()
    }

    fn next_tx_id(cid: &ContentId, sequence: usize) -> LedgerTxId {
        let mut hasher = Sha256::new();
        hasher.update(cid.as_str().as_bytes());
        hasher.update(sequence.to_le_bytes());
        LedgerTxId::new(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl AnchorLedger for MemoryLedger {
    async fn initialize(&self) -> Result<NetworkParameters, LedgerError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(NetworkParameters {
            network: "memory".to_string(),
            height: 1,
            milestones: vec![super::Milestone {
                height: 1,
                aip11: true,
            }],
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn broadcast(&self, cid: &ContentId) -> Result<BroadcastOutcome, LedgerError> {
        if !self.is_initialized() {
            return Err(LedgerError::NotInitialized);
        }
        let mut state = self.state.lock();
        state.submissions += 1;
        if let Some((kind, message)) = state.forced_rejection.clone() {
            return Ok(BroadcastOutcome::Rejected { kind, message });
        }
        if state.anchors.contains_key(cid) {
            return Ok(BroadcastOutcome::Rejected {
                kind: RejectionKind::AlreadyRegistered,
                message: ALREADY_REGISTERED.to_string(),
            });
        }
        let tx_id = Self::next_tx_id(cid, state.submissions);
        state.anchors.insert(cid.clone(), tx_id.clone());
        Ok(BroadcastOutcome::Accepted { tx_id })
    }

    async fn find_anchor_transaction_id(&self, cid: &ContentId) -> Result<LedgerTxId, LedgerError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.searches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_searches_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.search_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let state = self.state.lock();
            if state.failing_searches.contains(cid) {
                Err(LedgerError::Api {
                    endpoint: "POST /transactions/search".to_string(),
                    status: 500,
                    body: "injected search failure".to_string(),
                })
            } else if state.hidden_from_search.contains(cid) {
                Err(LedgerError::NotFound(cid.clone()))
            } else {
                state
                    .anchors
                    .get(cid)
                    .cloned()
                    .ok_or_else(|| LedgerError::NotFound(cid.clone()))
            }
        };
        self.searches_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn explorer_link(&self, tx_id: &LedgerTxId) -> Option<String> {
        super::explorer_link(&self.explorer_base, tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ContentId {
        ContentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn second_broadcast_is_already_registered() {
        let ledger = MemoryLedger::new();
        ledger.initialize().await.unwrap();
        let first = ledger.broadcast(&cid("bafy1")).await.unwrap();
        let tx_id = match first {
            BroadcastOutcome::Accepted { tx_id } => tx_id,
            other => panic!("expected acceptance, got {other:?}"),
        };
        let second = ledger.broadcast(&cid("bafy1")).await.unwrap();
        assert!(matches!(
            second,
            BroadcastOutcome::Rejected {
                kind: RejectionKind::AlreadyRegistered,
                ..
            }
        ));
        assert_eq!(ledger.find_anchor_transaction_id(&cid("bafy1")).await.unwrap(), tx_id);
        assert_eq!(ledger.submissions(), 2);
    }

    #[tokio::test]
    async fn broadcast_requires_initialize() {
        let ledger = MemoryLedger::new();
        assert!(matches!(
            ledger.broadcast(&cid("bafy1")).await,
            Err(LedgerError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn hidden_anchor_is_not_found() {
        let ledger = MemoryLedger::new();
        ledger.preload(cid("bafy1"), LedgerTxId::new("tx1"));
        ledger.hide_from_search(cid("bafy1"));
        assert!(matches!(
            ledger.find_anchor_transaction_id(&cid("bafy1")).await,
            Err(LedgerError::NotFound(_))
        ));
    }
}
