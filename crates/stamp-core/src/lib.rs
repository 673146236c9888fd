#![deny(missing_docs)]

//! # stamp-core: Foundational Types for the Stamp Service
//!
//! Every other crate in the workspace depends on this one. It performs no
//! I/O: it only defines the vocabulary shared between the content store,
//! the stamp log, the ledger client, and the HTTP surface.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`ContentId`] cannot be passed
//!    where a [`LedgerTxId`] is expected. Content identifiers are validated at
//!    construction and on deserialization.
//!
//! 2. **Stamp records are immutable facts.** A [`StampRecord`] is appended,
//!    never edited. Readers resolve multiple records for one content id with
//!    "most recent wins".
//!
//! 3. **The projection is derived.** [`StampedFileView`] joins a content
//!    entry, the pin set, and the latest stamp record. It is never persisted.

pub mod error;
pub mod identity;
pub mod naming;
pub mod record;

pub use error::ValidationError;
pub use identity::{ContentId, LedgerTxId};
pub use naming::{disambiguated_name, sanitize_file_name};
pub use record::{ContentEntry, StampInfo, StampRecord, StampedFileView};
