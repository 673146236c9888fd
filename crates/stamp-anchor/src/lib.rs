//! # stamp-anchor: Stamp Workflow State Machines
//!
//! The logic between the HTTP surface and the collaborators:
//!
//! - [`dedup`]: one file per content id in the stamped directory.
//! - [`orchestrator`]: anchor a content id on the ledger exactly once and
//!   record the proof, recovering from "already registered" rejections.
//! - [`reconcile`]: rebuild missing stamp records from ledger truth in
//!   bounded batches.
//! - [`content`]: upload, delete and pin operations.
//! - [`view`]: the `StampedFileView` projection.
//!
//! ## Concurrency
//!
//! Requests interleave at every collaborator call. The orchestrator and
//! the reconciler are the only writers of the stamp log, and both take the
//! per-content-id lock in [`lock`] before checking and appending. A
//! [`StampService`] owns one lock set and hands it to both.

pub mod content;
pub mod dedup;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod reconcile;
pub mod view;

pub use content::UploadOutcome;
pub use dedup::DedupReport;
pub use error::{AnchorError, ContentError, DedupError, SyncError};
pub use lock::KeyedLock;
pub use orchestrator::{AnchorOrchestrator, AnchorOutcome, AnchorState, ExistingAnchorPolicy};
pub use reconcile::{Reconciler, SyncReport, BATCH_SIZE};

use std::sync::Arc;

use stamp_client::{AnchorLedger, ContentStore, StampClients, StampLog, StoreError, StoreVersion};
use stamp_core::{ContentId, StampedFileView};

/// Collaborator handles injected into every workflow.
#[derive(Clone)]
pub struct Services {
    /// Content-addressed file store.
    pub store: Arc<dyn ContentStore>,
    /// Append-only stamp log.
    pub log: Arc<dyn StampLog>,
    /// Anchoring ledger.
    pub ledger: Arc<dyn AnchorLedger>,
}

impl Services {
    /// Handles from a connected production client set.
    pub fn from_clients(clients: &StampClients) -> Self {
        Self {
            store: clients.store(),
            log: clients.log(),
            ledger: clients.ledger(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("stamped_dir", &self.store.directory())
            .field("ledger_initialized", &self.ledger.is_initialized())
            .finish()
    }
}

/// Entry point for every stamp workflow.
#[derive(Clone)]
pub struct StampService {
    services: Services,
    orchestrator: AnchorOrchestrator,
    reconciler: Reconciler,
}

impl StampService {
    /// Build the workflows over `services` with one shared lock set.
    pub fn new(services: Services, policy: ExistingAnchorPolicy) -> Self {
        let locks = Arc::new(KeyedLock::new());
        Self {
            orchestrator: AnchorOrchestrator::new(services.clone(), locks.clone(), policy),
            reconciler: Reconciler::new(services.clone(), locks),
            services,
        }
    }

    /// Injected collaborators.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Content store node version.
    pub async fn version(&self) -> Result<StoreVersion, StoreError> {
        self.services.store.version().await
    }

    /// The `StampedFileView` projection of the stamped directory.
    pub async fn list_stamped_files(&self) -> Result<Vec<StampedFileView>, ContentError> {
        Ok(view::list_stamped_files(
            self.services.store.as_ref(),
            self.services.log.as_ref(),
            self.services.ledger.as_ref(),
        )
        .await?)
    }

    /// Store an upload and deduplicate.
    pub async fn upload(&self, original_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome, ContentError> {
        content::upload(self.services.store.as_ref(), original_name, bytes).await
    }

    /// Delete every file with content id `cid`.
    pub async fn delete(&self, cid: &ContentId) -> Result<usize, ContentError> {
        content::delete_by_content_id(self.services.store.as_ref(), cid).await
    }

    /// Pin or unpin `cid`.
    pub async fn set_pin(&self, cid: &ContentId, pinned: bool) -> Result<(), ContentError> {
        content::set_pin(self.services.store.as_ref(), cid, pinned).await
    }

    /// Run one deduplication pass.
    pub async fn remove_duplicates(&self) -> Result<DedupReport, DedupError> {
        dedup::remove_duplicates(self.services.store.as_ref()).await
    }

    /// Reconcile the stamp log against the ledger.
    pub async fn synchronize_log(&self) -> Result<SyncReport, SyncError> {
        self.reconciler.synchronize_log().await
    }

    /// Anchor `cid` on the ledger.
    pub async fn broadcast_cid(&self, cid: &ContentId) -> Result<AnchorOutcome, AnchorError> {
        self.orchestrator.broadcast_cid(cid).await
    }
}

impl std::fmt::Debug for StampService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampService")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
