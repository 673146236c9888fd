//! End-to-end stamp workflows over in-memory collaborators.

use std::sync::Arc;

use stamp_anchor::{AnchorState, ContentError, ExistingAnchorPolicy, Services, StampService};
use stamp_client::{AnchorLedger, ContentStore, MemoryContentStore, MemoryLedger, MemoryStampLog, StampLog};
use stamp_core::{ContentId, LedgerTxId, StampRecord};

struct Harness {
    store: Arc<MemoryContentStore>,
    log: Arc<MemoryStampLog>,
    ledger: Arc<MemoryLedger>,
    service: StampService,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryContentStore::new("/stamped"));
    let log = Arc::new(MemoryStampLog::new());
    let ledger = Arc::new(MemoryLedger::new());
    ledger.initialize().await.unwrap();
    let services = Services {
        store: store.clone(),
        log: log.clone(),
        ledger: ledger.clone(),
    };
    Harness {
        store,
        log,
        ledger,
        service: StampService::new(services, ExistingAnchorPolicy::Idempotent),
    }
}

#[tokio::test]
async fn upload_anchor_and_list() {
    let h = harness().await;
    let upload = h.service.upload("contract.pdf", b"%PDF-1.7".to_vec()).await.unwrap();
    h.service.set_pin(&upload.content_id, true).await.unwrap();

    let anchor = h.service.broadcast_cid(&upload.content_id).await.unwrap();
    assert_eq!(anchor.state, AnchorState::Anchored);

    let views = h.service.list_stamped_files().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].full_name, upload.full_name);
    assert!(views[0].pinned);
    assert_eq!(
        views[0].stamped.as_ref().unwrap().ledger_tx_id,
        anchor.ledger_tx_id
    );
}

#[tokio::test]
async fn repeated_anchor_requests_keep_one_distinct_tx_per_cid() {
    let h = harness().await;
    let upload = h.service.upload("a.txt", b"hello".to_vec()).await.unwrap();

    for _ in 0..3 {
        h.service.broadcast_cid(&upload.content_id).await.unwrap();
    }

    let distinct: std::collections::HashSet<_> = h
        .log
        .records()
        .into_iter()
        .filter(|r| r.content_id == upload.content_id)
        .map(|r| r.ledger_tx_id)
        .collect();
    assert_eq!(distinct.len(), 1);
    assert_eq!(h.ledger.submissions(), 1);
}

#[tokio::test]
async fn log_loss_is_repaired_by_synchronization() {
    let h = harness().await;
    let a = h.service.upload("a.txt", b"aaa".to_vec()).await.unwrap();
    let b = h.service.upload("b.txt", b"bbb".to_vec()).await.unwrap();

    // Anchored on the ledger by an earlier run whose log was lost.
    h.ledger.preload(a.content_id.clone(), LedgerTxId::new("tx-a"));
    h.ledger.preload(b.content_id.clone(), LedgerTxId::new("tx-b"));

    let report = h.service.synchronize_log().await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.reconciled, 2);

    let views = h.service.list_stamped_files().await.unwrap();
    assert!(views.iter().all(|v| v.stamped.is_some()));
}

#[tokio::test]
async fn anchor_after_reconciliation_is_idempotent() {
    let h = harness().await;
    let cid = ContentId::new("bafy1").unwrap();
    h.store.insert_entry("x_a.txt", cid.clone(), 3);
    h.ledger.preload(cid.clone(), LedgerTxId::new("tx1"));

    h.service.synchronize_log().await.unwrap();
    let outcome = h.service.broadcast_cid(&cid).await.unwrap();
    assert_eq!(outcome.state, AnchorState::AlreadyAnchored);
    assert_eq!(outcome.ledger_tx_id.as_str(), "tx1");
    assert_eq!(h.ledger.submissions(), 0);
}

#[tokio::test]
async fn delete_then_delete_again_is_not_found() {
    let h = harness().await;
    let upload = h.service.upload("a.txt", b"x".to_vec()).await.unwrap();
    assert_eq!(h.service.delete(&upload.content_id).await.unwrap(), 1);
    assert!(matches!(
        h.service.delete(&upload.content_id).await,
        Err(ContentError::NotFound(_))
    ));
}

#[tokio::test]
async fn stale_log_record_for_deleted_file_is_not_listed() {
    let h = harness().await;
    h.store.ensure_directory().await.unwrap();
    h.log
        .append(StampRecord::new(ContentId::new("bafygone").unwrap(), LedgerTxId::new("tx")))
        .await
        .unwrap();
    assert!(h.service.list_stamped_files().await.unwrap().is_empty());
}
