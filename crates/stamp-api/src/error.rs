//! # API Error Types
//!
//! The single boundary where workflow and collaborator errors become HTTP
//! responses. Every error body is `{"message": "...", "data": ...}` with
//! `data` omitted unless the error carries structured context.
//!
//! | Variant | Status |
//! |---------|--------|
//! | `Validation`, `BadRequest` | 400 |
//! | `NotFound` | 404 |
//! | `Conflict` | 409 |
//! | `PayloadTooLarge` | 413 |
//! | `Upstream`, `Internal` | 500 |
//! | `ServiceUnavailable` | 503 |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use stamp_anchor::{AnchorError, ContentError, DedupError, SyncError};
use stamp_client::{LedgerError, LogError, StoreError};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Structured context, e.g. the existing transaction on a conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request failed a domain validation rule (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflict with current state (409).
    #[error("{message}")]
    Conflict {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Upload exceeds the configured body limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// A collaborator failed (500). The message is returned and logged.
    #[error("{0}")]
    Upstream(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// A collaborator is not ready to serve (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let data = match self {
            Self::Conflict { data, .. } => data,
            _ => None,
        };

        (status, Json(ErrorBody { message, data })).into_response()
    }
}

impl From<stamp_core::ValidationError> for AppError {
    fn from(err: stamp_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FileNotFound { .. } => Self::NotFound(err.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<LogError> for AppError {
    fn from(err: LogError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotInitialized => Self::ServiceUnavailable(err.to_string()),
            LedgerError::NotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(_) => Self::NotFound(err.to_string()),
            ContentError::Store(e) => e.into(),
            ContentError::Log(e) => e.into(),
            ContentError::Dedup(e) => e.into(),
        }
    }
}

impl From<DedupError> for AppError {
    fn from(err: DedupError) -> Self {
        match err {
            DedupError::Store(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(e) => Self::Upstream(e.to_string()),
            SyncError::Log(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<AnchorError> for AppError {
    fn from(err: AnchorError) -> Self {
        match err {
            AnchorError::Conflict {
                ref content_id,
                ref existing,
            } => Self::Conflict {
                data: Some(serde_json::json!({
                    "contentId": content_id,
                    "ledgerTxId": existing,
                })),
                message: err.to_string(),
            },
            AnchorError::Rejected { message } => Self::Upstream(message),
            AnchorError::Internal(message) => Self::Internal(message),
            AnchorError::Ledger(e) => e.into(),
            AnchorError::Log(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use stamp_core::{ContentId, LedgerTxId};

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn cid() -> ContentId {
        ContentId::new("bafy1").unwrap()
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let (status, body) = response_parts(AppError::Internal("db password wrong".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("password"));
        assert!(body.data.is_none());
    }

    #[tokio::test]
    async fn conflict_carries_existing_transaction() {
        let err: AppError = AnchorError::Conflict {
            content_id: cid(),
            existing: LedgerTxId::new("tx9"),
        }
        .into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.message, "content id bafy1 is already anchored");
        let data = body.data.unwrap();
        assert_eq!(data["ledgerTxId"], "tx9");
        assert_eq!(data["contentId"], "bafy1");
    }

    #[tokio::test]
    async fn ledger_rejection_surfaces_ledger_message() {
        let err: AppError = AnchorError::Rejected {
            message: "Insufficient balance".into(),
        }
        .into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Insufficient balance");
    }

    #[tokio::test]
    async fn uninitialized_ledger_is_unavailable() {
        let err: AppError = AnchorError::Ledger(LedgerError::NotInitialized).into();
        let (status, _) = response_parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn missing_content_is_not_found() {
        let err: AppError = ContentError::NotFound(cid()).into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.message.contains("bafy1"));
    }

    #[tokio::test]
    async fn store_failure_is_upstream() {
        let err: AppError = ContentError::Store(StoreError::Api {
            endpoint: "files/ls".into(),
            status: 500,
            message: "node offline".into(),
        })
        .into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.message.contains("node offline"));
    }

    #[tokio::test]
    async fn invalid_content_id_is_bad_request() {
        let err: AppError = ContentId::new("../etc").unwrap_err().into();
        let (status, _) = response_parts(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
