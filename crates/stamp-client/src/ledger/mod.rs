//! # Ledger Anchoring Client
//!
//! An anchor is a ledger transaction whose asset payload is a content id.
//! [`AnchorLedger`] exposes exactly what orchestration needs: bootstrap
//! network parameters, broadcast an anchor, and look up an existing anchor.
//!
//! ## Outcome classification
//!
//! A broadcast never fails just because the ledger said no. Transport and
//! decoding problems are `Err(LedgerError)`; a ledger verdict is a
//! [`BroadcastOutcome`]. The one verdict callers recover from is
//! [`RejectionKind::AlreadyRegistered`]: an earlier submission with this
//! payload was already accepted, so its id can be found by search.
//!
//! Implementations:
//! - [`HttpLedgerClient`]: ARK-style public REST API.
//! - [`MemoryLedger`]: in-process ledger for tests.

mod http;
mod memory;
pub mod transaction;

pub use http::HttpLedgerClient;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stamp_core::{ContentId, LedgerTxId};

use crate::error::LedgerError;

/// A network milestone: rules active from `height` onwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// First block height at which this milestone applies.
    pub height: u64,
    /// Whether nonce-based (version 2) transactions are active.
    #[serde(default)]
    pub aip11: bool,
}

/// Parameters loaded by [`AnchorLedger::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    /// Network name reported by the node.
    pub network: String,
    /// Chain height at initialization.
    pub height: u64,
    /// Milestones, in any order.
    pub milestones: Vec<Milestone>,
}

impl NetworkParameters {
    /// The milestone in force at the recorded height: the one with the
    /// greatest `height` not above it.
    pub fn active_milestone(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .filter(|m| m.height <= self.height)
            .max_by_key(|m| m.height)
    }

    /// Transaction format version for new transactions.
    pub fn transaction_version(&self) -> u8 {
        match self.active_milestone() {
            Some(m) if m.aip11 => 2,
            _ => 1,
        }
    }
}

/// Why the ledger refused a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// A transaction with this payload is already on the ledger.
    AlreadyRegistered,
    /// Any other structured rejection.
    Other,
    /// The ledger neither accepted nor returned a structured error.
    Unknown,
}

/// Ledger verdict on a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Accepted into the pool under `tx_id`.
    Accepted { tx_id: LedgerTxId },
    /// Refused.
    Rejected { kind: RejectionKind, message: String },
}

/// Classify a ledger rejection message.
pub fn classify_rejection(message: &str) -> RejectionKind {
    if message.to_ascii_lowercase().contains("already registered") {
        RejectionKind::AlreadyRegistered
    } else {
        RejectionKind::Other
    }
}

/// Explorer URL for `tx_id`, or `None` for the unknown sentinel.
pub fn explorer_link(explorer_base: &url::Url, tx_id: &LedgerTxId) -> Option<String> {
    if tx_id.is_unknown() {
        return None;
    }
    Some(format!(
        "{}/transaction/{}",
        explorer_base.as_str().trim_end_matches('/'),
        tx_id
    ))
}

/// Capability over the anchoring ledger.
#[async_trait]
pub trait AnchorLedger: Send + Sync {
    /// Load network parameters and the current height. Must succeed before
    /// [`broadcast`](Self::broadcast) can build a transaction.
    async fn initialize(&self) -> Result<NetworkParameters, LedgerError>;

    /// Whether [`initialize`](Self::initialize) has completed.
    fn is_initialized(&self) -> bool;

    /// Build, sign and submit an anchoring transaction for `cid`.
    ///
    /// The sender nonce is fetched on every call. Concurrent broadcasts from
    /// one wallet can collide; callers serialize submissions.
    async fn broadcast(&self, cid: &ContentId) -> Result<BroadcastOutcome, LedgerError>;

    /// Id of an existing anchoring transaction for `cid`.
    ///
    /// Fails with [`LedgerError::NotFound`] when no such transaction exists.
    async fn find_anchor_transaction_id(&self, cid: &ContentId) -> Result<LedgerTxId, LedgerError>;

    /// Explorer link for `tx_id`; `None` for the unknown sentinel.
    fn explorer_link(&self, tx_id: &LedgerTxId) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(height: u64, milestones: &[(u64, bool)]) -> NetworkParameters {
        NetworkParameters {
            network: "devnet".into(),
            height,
            milestones: milestones
                .iter()
                .map(|&(height, aip11)| Milestone { height, aip11 })
                .collect(),
        }
    }

    #[test]
    fn version_two_once_aip11_is_active() {
        let p = params(100, &[(1, false), (50, true)]);
        assert_eq!(p.transaction_version(), 2);
    }

    #[test]
    fn version_one_before_aip11_height() {
        let p = params(10, &[(1, false), (50, true)]);
        assert_eq!(p.transaction_version(), 1);
    }

    #[test]
    fn version_one_without_milestones() {
        assert_eq!(params(10, &[]).transaction_version(), 1);
    }

    #[test]
    fn unordered_milestones_pick_highest_applicable() {
        let p = params(100, &[(80, false), (1, true), (50, true)]);
        assert_eq!(p.active_milestone().unwrap().height, 80);
        assert_eq!(p.transaction_version(), 1);
    }

    #[test]
    fn classify_already_registered() {
        let msg = "Failed to apply transaction, because this IPFS hash is already registered on the blockchain.";
        assert_eq!(classify_rejection(msg), RejectionKind::AlreadyRegistered);
        assert_eq!(classify_rejection("insufficient balance"), RejectionKind::Other);
    }

    #[test]
    fn explorer_link_hides_sentinel() {
        let base = url::Url::parse("https://explorer.test/").unwrap();
        assert_eq!(
            explorer_link(&base, &LedgerTxId::new("abc")).as_deref(),
            Some("https://explorer.test/transaction/abc")
        );
        assert!(explorer_link(&base, &LedgerTxId::unknown()).is_none());
    }
}
