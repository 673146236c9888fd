//! # stamp-cli: Operator CLI for the Stamp Service
//!
//! Runs the maintenance workflows directly against the configured
//! collaborators, without the HTTP server. Configuration comes from the
//! same environment variables as `stamp-api`.
//!
//! ## Subcommands
//!
//! - `stamp list`: stamped files with pin and anchor state.
//! - `stamp dedup`: remove duplicate files from the stamped directory.
//! - `stamp sync`: rebuild missing stamp records from the ledger.
//! - `stamp anchor <CID>`: anchor a content id.
//! - `stamp pin <CID> --state true|false`: set pin state.
//! - `stamp keygen`: generate an anchoring wallet seed (offline).
//!
//! Every subcommand prints a JSON document on stdout and returns an exit
//! code: 0 on success, 1 when the operation completed with item failures,
//! 2 on operational error.

pub mod content;
pub mod ledger;
pub mod wallet;

use anyhow::{Context, Result};
use stamp_anchor::{ExistingAnchorPolicy, Services, StampService};
use stamp_client::{StampClients, StampConfig};

/// Connect to the collaborators named in the environment and prepare them
/// the way the server bootstrap does.
pub async fn service_from_env() -> Result<StampService> {
    let config = StampConfig::from_env().context("loading configuration")?;
    tracing::debug!(config = ?config, "configuration loaded");

    let clients = StampClients::connect(&config)
        .await
        .context("connecting collaborators")?;
    let services = Services::from_clients(&clients);

    services
        .store
        .ensure_directory()
        .await
        .context("preparing the stamped directory")?;
    services
        .ledger
        .initialize()
        .await
        .context("loading ledger network parameters")?;

    Ok(StampService::new(services, ExistingAnchorPolicy::default()))
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn print_json(out: &mut dyn std::io::Write, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use stamp_anchor::{ExistingAnchorPolicy, Services, StampService};
    use stamp_client::{AnchorLedger, ContentStore, MemoryContentStore, MemoryLedger, MemoryStampLog};

    pub struct Fixture {
        pub store: Arc<MemoryContentStore>,
        pub log: Arc<MemoryStampLog>,
        pub ledger: Arc<MemoryLedger>,
        pub service: StampService,
    }

    pub async fn fixture() -> Fixture {
        let store = Arc::new(MemoryContentStore::new("/stamped"));
        store.ensure_directory().await.unwrap();
        let log = Arc::new(MemoryStampLog::new());
        let ledger = Arc::new(MemoryLedger::new());
        ledger.initialize().await.unwrap();
        let services = Services {
            store: store.clone(),
            log: log.clone(),
            ledger: ledger.clone(),
        };
        Fixture {
            store,
            log,
            ledger,
            service: StampService::new(services, ExistingAnchorPolicy::Idempotent),
        }
    }

    pub fn output_json(out: &[u8]) -> serde_json::Value {
        serde_json::from_slice(out).unwrap()
    }
}
