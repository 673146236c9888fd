//! # stamp-client: Typed clients for the stamp service's collaborators
//!
//! The stamp service orchestrates three external systems and never talks
//! to them directly outside this crate:
//! - **Content store** ([`store`]): a Kubo-compatible content-addressed
//!   file store, scoped to one "stamped" directory.
//! - **Stamp log** ([`log`]): the append-only record of anchored content ids.
//! - **Ledger** ([`ledger`]): an ARK-style public ledger carrying anchors.
//!
//! Each is an object-safe async trait with an HTTP (or file) implementation
//! and an in-memory double. Orchestration code receives `Arc<dyn Trait>`
//! handles and never knows which one it has.
//!
//! ## Lifecycle
//!
//! [`StampClients::connect`] builds the production handles from a
//! [`StampConfig`]. It opens the stamp log but does not contact the store
//! or the ledger; the server bootstrap calls
//! [`ContentStore::ensure_directory`] and [`AnchorLedger::initialize`].

pub mod config;
pub mod error;
pub mod ledger;
pub mod log;
pub(crate) mod retry;
pub mod store;

pub use config::{ConfigError, StampConfig, WalletSecret};
pub use error::{ConnectError, LedgerError, LogError, StoreError};
pub use ledger::{AnchorLedger, BroadcastOutcome, HttpLedgerClient, MemoryLedger, RejectionKind};
pub use log::{FileStampLog, MemoryStampLog, StampLog};
pub use store::{ContentStore, IpfsContentStore, MemoryContentStore, StoreVersion};

use std::sync::Arc;

/// Production collaborator handles.
#[derive(Debug, Clone)]
pub struct StampClients {
    store: Arc<IpfsContentStore>,
    log: Arc<FileStampLog>,
    ledger: Arc<HttpLedgerClient>,
}

impl StampClients {
    /// Build HTTP clients and open the stamp log.
    pub async fn connect(config: &StampConfig) -> Result<Self, ConnectError> {
        let store = IpfsContentStore::new(
            config.ipfs_api_url.clone(),
            config.stamped_dir.clone(),
            config.timeout_secs,
        )?;
        let log = FileStampLog::open(&config.log_path).await?;
        let ledger = HttpLedgerClient::new(config)?;
        Ok(Self {
            store: Arc::new(store),
            log: Arc::new(log),
            ledger: Arc::new(ledger),
        })
    }

    /// Content store handle.
    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    /// Stamp log handle.
    pub fn log(&self) -> Arc<dyn StampLog> {
        self.log.clone()
    }

    /// Ledger handle.
    pub fn ledger(&self) -> Arc<dyn AnchorLedger> {
        self.ledger.clone()
    }
}
