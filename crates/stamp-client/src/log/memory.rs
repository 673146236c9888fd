//! In-process stamp log.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use stamp_core::StampRecord;

use super::StampLog;
use crate::error::LogError;

/// Stamp log held in memory, in append order.
#[derive(Debug, Default)]
pub struct MemoryStampLog {
    records: RwLock<Vec<StampRecord>>,
    fail_appends: AtomicBool,
}

impl MemoryStampLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding `records`, oldest first.
    pub fn with_records(records: Vec<StampRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            fail_appends: AtomicBool::new(false),
        }
    }

    /// Make every later append fail with an I/O error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Records in append order (oldest first).
    pub fn records(&self) -> Vec<StampRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl StampLog for MemoryStampLog {
    async fn append(&self, record: StampRecord) -> Result<(), LogError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(LogError::Io {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "append disabled"),
            });
        }
        self.records.write().push(record);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<StampRecord>, LogError> {
        Ok(self.records.read().iter().rev().cloned().collect())
    }
}
