//! # Server Bootstrap
//!
//! Brings the injected collaborators to a ready state before the first
//! request:
//!
//! 1. **Stamped directory**: create it in the content store if missing.
//! 2. **Ledger**: load network parameters and milestones.
//! 3. **Reconciliation** (optional): repair the stamp log from the ledger.
//!
//! A failed reconciliation is logged and does not stop the server; the
//! operator can retry through `POST /content/items/synchronizeLog`.

use stamp_anchor::{ExistingAnchorPolicy, Services, StampService};
use stamp_client::{LedgerError, StoreError};

use crate::state::{AppConfig, AppState};

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The stamped directory could not be prepared.
    #[error("content store bootstrap failed: {0}")]
    Store(#[from] StoreError),

    /// The ledger's network parameters could not be loaded.
    #[error("ledger bootstrap failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Prepare collaborators and build the application state.
pub async fn bootstrap(config: AppConfig, services: Services) -> Result<AppState, BootstrapError> {
    services.store.ensure_directory().await?;
    tracing::info!(directory = services.store.directory(), "stamped directory ready");

    let params = services.ledger.initialize().await?;
    tracing::info!(network = %params.network, height = params.height, "ledger ready");

    let service = StampService::new(services, ExistingAnchorPolicy::default());

    if config.sync_on_startup {
        match service.synchronize_log().await {
            Ok(report) => tracing::info!(
                attempted = report.attempted,
                reconciled = report.reconciled,
                skipped = report.skipped,
                "startup log synchronization complete"
            ),
            Err(e) => tracing::warn!(error = %e, "startup log synchronization failed"),
        }
    }

    Ok(AppState::new(service, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stamp_client::{AnchorLedger, MemoryContentStore, MemoryLedger, MemoryStampLog};
    use stamp_core::{ContentId, LedgerTxId};

    fn services(
        store: Arc<MemoryContentStore>,
        log: Arc<MemoryStampLog>,
        ledger: Arc<MemoryLedger>,
    ) -> Services {
        Services { store, log, ledger }
    }

    #[tokio::test]
    async fn bootstrap_creates_directory_and_initializes_ledger() {
        let store = Arc::new(MemoryContentStore::new("/stamped"));
        let ledger = Arc::new(MemoryLedger::new());
        let state = bootstrap(
            AppConfig::default(),
            services(store.clone(), Arc::new(MemoryStampLog::new()), ledger.clone()),
        )
        .await
        .unwrap();

        assert!(ledger.is_initialized());
        assert!(state.service.list_stamped_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_fails_when_directory_path_is_a_file() {
        let store = Arc::new(MemoryContentStore::new("/stamped"));
        store.occupy_directory_path_with_file();
        let result = bootstrap(
            AppConfig::default(),
            services(store, Arc::new(MemoryStampLog::new()), Arc::new(MemoryLedger::new())),
        )
        .await;

        assert!(matches!(
            result,
            Err(BootstrapError::Store(StoreError::DirectoryConflict { .. }))
        ));
    }

    #[tokio::test]
    async fn sync_on_startup_repairs_the_log() {
        let store = Arc::new(MemoryContentStore::new("/stamped"));
        let log = Arc::new(MemoryStampLog::new());
        let ledger = Arc::new(MemoryLedger::new());
        let cid = ContentId::new("bafy1").unwrap();
        store.insert_entry("x_a.txt", cid.clone(), 3);
        ledger.preload(cid.clone(), LedgerTxId::new("tx1"));

        let config = AppConfig {
            sync_on_startup: true,
            ..AppConfig::default()
        };
        bootstrap(config, services(store, log.clone(), ledger))
            .await
            .unwrap();

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content_id, cid);
        assert_eq!(records[0].ledger_tx_id, LedgerTxId::new("tx1"));
    }
}
