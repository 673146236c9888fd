//! Collaborator error types.

use stamp_core::ContentId;

/// Errors from the content store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport error.
    #[error("HTTP error calling content store {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The store returned a non-2xx status.
    #[error("content store {endpoint} returned {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize content store response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// The stamped path exists but is not a directory.
    #[error("\"{path}\" exists in the content store but is not a directory")]
    DirectoryConflict { path: String },
    /// No file with this name exists in the stamped directory.
    #[error("file \"{name}\" not found in the stamped directory")]
    FileNotFound { name: String },
    /// The store reported a malformed content identifier.
    #[error("content store returned an invalid content id: {0}")]
    InvalidContentId(#[from] stamp_core::ValidationError),
}

/// Errors from the stamp log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// I/O failure reading or appending the log file.
    #[error("stamp log I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// A record could not be serialized.
    #[error("failed to encode stamp record: {0}")]
    Encode(#[from] serde_json::Error),
    /// A complete (newline-terminated) line could not be decoded.
    #[error("corrupt stamp log line {line} in {path}: {reason}")]
    Corrupt {
        path: String,
        line: usize,
        reason: String,
    },
}

/// Errors from the ledger client.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No anchoring transaction carries this content id.
    #[error("content id {0} was not found on the ledger")]
    NotFound(ContentId),
    /// A transaction was built before network parameters were loaded.
    #[error("ledger client is not initialized: call initialize() before signing")]
    NotInitialized,
    /// HTTP transport error.
    #[error("HTTP error calling ledger {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The ledger returned a non-2xx status.
    #[error("ledger {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize ledger response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// Transaction construction or signing failed.
    #[error("failed to build transaction: {0}")]
    Signing(String),
}

/// Failure building the collaborator handles.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
