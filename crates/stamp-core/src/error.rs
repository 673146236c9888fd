//! # Validation Errors
//!
//! Errors raised when constructing domain newtypes from untrusted input
//! (path parameters, multipart file names, log lines).

use thiserror::Error;

/// Validation errors for domain newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Content identifier was empty after trimming.
    #[error("content id must not be empty")]
    EmptyContentId,

    /// Content identifier contains characters a content-addressed store never emits.
    #[error("invalid content id: \"{0}\" (expected an alphanumeric multibase string)")]
    InvalidContentId(String),

    /// Content identifier exceeds the maximum accepted length.
    #[error("content id exceeds {max} characters (got {actual})")]
    ContentIdTooLong {
        /// Maximum accepted length.
        max: usize,
        /// Length of the rejected input.
        actual: usize,
    },
}
