//! Durability tests for the JSON Lines stamp log.

use std::io::Write;

use stamp_client::{FileStampLog, LogError, StampLog};
use stamp_core::{ContentId, LedgerTxId, StampRecord};

fn record(cid: &str, tx: &str) -> StampRecord {
    StampRecord::new(ContentId::new(cid).unwrap(), LedgerTxId::new(tx))
}

#[tokio::test]
async fn records_survive_reopen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stamp-log.jsonl");

    {
        let log = FileStampLog::open(&path).await.unwrap();
        log.append(record("bafy1", "tx1")).await.unwrap();
        log.append(record("bafy2", "tx2")).await.unwrap();
    }

    let reopened = FileStampLog::open(&path).await.unwrap();
    let snapshot = reopened.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].content_id.as_str(), "bafy2");
    assert_eq!(snapshot[1].content_id.as_str(), "bafy1");
}

#[tokio::test]
async fn open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("log.jsonl");

    let log = FileStampLog::open(&path).await.unwrap();
    assert!(log.is_empty().await.unwrap());
    assert!(path.exists());
}

#[tokio::test]
async fn torn_tail_is_dropped_and_appends_continue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"contentId":"bafy1","ledgerTxId":"tx1"}}"#).unwrap();
        write!(f, r#"{{"contentId":"bafy2","ledg"#).unwrap();
    }

    let log = FileStampLog::open(&path).await.unwrap();
    assert_eq!(log.len().await.unwrap(), 1);
    log.append(record("bafy3", "tx3")).await.unwrap();

    let reopened = FileStampLog::open(&path).await.unwrap();
    let cids: Vec<String> = reopened
        .snapshot()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.content_id.to_string())
        .collect();
    assert_eq!(cids, vec!["bafy3", "bafy1"]);
}

#[tokio::test]
async fn append_after_partial_write_keeps_log_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");

    let log = FileStampLog::open(&path).await.unwrap();
    log.append(record("bafy1", "tx1")).await.unwrap();
    {
        // A write that stopped partway through a line.
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(f, r#"{{"contentId":"ba"#).unwrap();
    }
    log.append(record("bafy2", "tx2")).await.unwrap();
    assert_eq!(log.len().await.unwrap(), 2);

    let reopened = FileStampLog::open(&path).await.unwrap();
    let cids: Vec<String> = reopened
        .snapshot()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.content_id.to_string())
        .collect();
    assert_eq!(cids, vec!["bafy2", "bafy1"]);
}

#[tokio::test]
async fn corrupt_complete_line_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    std::fs::write(&path, "garbage\n").unwrap();

    let err = FileStampLog::open(&path).await.unwrap_err();
    assert!(matches!(err, LogError::Corrupt { line: 1, .. }));
}

#[tokio::test]
async fn find_prefers_most_recent_record() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileStampLog::open(dir.path().join("log.jsonl")).await.unwrap();
    log.append(record("bafy1", "")).await.unwrap();
    log.append(record("bafy1", "tx-real")).await.unwrap();

    let found = log
        .find_by_content_id(&ContentId::new("bafy1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.ledger_tx_id.as_str(), "tx-real");
}
