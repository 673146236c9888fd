//! # API Route Modules
//!
//! - `content`: the stamped directory. Listing, upload, delete, pin, and
//!   the maintenance operations (deduplication, log synchronization).
//! - `ledger`: anchoring a content id on the ledger.

pub mod content;
pub mod ledger;

use serde::Serialize;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
