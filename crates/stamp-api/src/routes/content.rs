//! # Stamped Content API
//!
//! ## Endpoints
//!
//! - `GET /content/version`: content store node version
//! - `GET /content/items`: the stamped-file projection
//! - `PUT /content/items`: upload (multipart field `document`)
//! - `DELETE /content/items/:contentId`: delete every file with the id
//! - `PATCH /content/items/:contentId/pin`: set pin state
//! - `POST /content/items/removeDuplicates`: one deduplication pass
//! - `POST /content/items/synchronizeLog`: reconcile the stamp log

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use stamp_client::StoreVersion;
use stamp_core::StampedFileView;
use utoipa::ToSchema;

use super::Data;
use crate::error::AppError;
use crate::extractors::{content_id_param, extract_json, extract_multipart, multipart_error};
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "document";

// ── Request/Response DTOs ───────────────────────────────────────────

/// Content store node version.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
    pub repo: String,
    pub system: String,
    pub golang: String,
}

impl From<StoreVersion> for VersionResponse {
    fn from(v: StoreVersion) -> Self {
        Self {
            version: v.version,
            commit: v.commit,
            repo: v.repo,
            system: v.system,
            golang: v.golang,
        }
    }
}

/// A stored upload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Name of the file holding the bytes. An earlier file's name when the
    /// same bytes were already stored.
    pub full_name: String,
    pub content_id: String,
}

/// Result of a delete.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub content_id: String,
    /// Number of files removed.
    pub removed: usize,
}

/// Pin state change request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub new_pin_state: bool,
}

/// Result of a pin state change.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinResponse {
    pub content_id: String,
    pub pinned: bool,
}

/// Result of a deduplication pass.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DedupResponse {
    pub removed: usize,
    pub failed: usize,
}

/// Result of a log synchronization pass.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub attempted: usize,
    pub reconciled: usize,
    pub skipped: usize,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the content router. Uploads are capped at `upload_max_bytes`.
pub fn router(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/content/version", get(version))
        .route(
            "/content/items",
            get(list_items)
                .put(upload_item)
                .layer(DefaultBodyLimit::max(upload_max_bytes)),
        )
        .route("/content/items/:contentId", delete(delete_item))
        .route("/content/items/:contentId/pin", patch(set_pin))
        .route("/content/items/removeDuplicates", post(remove_duplicates))
        .route("/content/items/synchronizeLog", post(synchronize_log))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /content/version
#[utoipa::path(
    get,
    path = "/content/version",
    responses(
        (status = 200, description = "Content store version", body = VersionResponse),
        (status = 500, description = "Content store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn version(State(state): State<AppState>) -> Result<Json<VersionResponse>, AppError> {
    Ok(Json(state.service.version().await?.into()))
}

/// GET /content/items
#[utoipa::path(
    get,
    path = "/content/items",
    responses(
        (status = 200, description = "Stamped files, one per content id", body = Vec<StampedFileView>),
        (status = 500, description = "Collaborator failure", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<StampedFileView>>, AppError> {
    Ok(Json(state.service.list_stamped_files().await?))
}

/// PUT /content/items
#[utoipa::path(
    put,
    path = "/content/items",
    request_body(content = String, content_type = "multipart/form-data", description = "File in the `document` field"),
    responses(
        (status = 201, description = "File stored, wrapped in `data`", body = UploadResponse),
        (status = 400, description = "No file uploaded", body = crate::error::ErrorBody),
        (status = 413, description = "File exceeds the upload limit", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn upload_item(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Data<UploadResponse>>), AppError> {
    let mut multipart = extract_multipart(multipart)?;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let outcome = state.service.upload(&original_name, bytes.to_vec()).await?;
        return Ok((
            StatusCode::CREATED,
            Json(Data::new(UploadResponse {
                full_name: outcome.full_name,
                content_id: outcome.content_id.to_string(),
            })),
        ));
    }
    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// DELETE /content/items/:contentId
#[utoipa::path(
    delete,
    path = "/content/items/{contentId}",
    params(("contentId" = String, Path, description = "Content id")),
    responses(
        (status = 200, description = "Files removed, wrapped in `data`", body = DeleteResponse),
        (status = 404, description = "No file has this content id", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Data<DeleteResponse>>, AppError> {
    let cid = content_id_param(raw)?;
    let removed = state.service.delete(&cid).await?;
    Ok(Json(Data::new(DeleteResponse {
        content_id: cid.to_string(),
        removed,
    })))
}

/// PATCH /content/items/:contentId/pin
#[utoipa::path(
    patch,
    path = "/content/items/{contentId}/pin",
    params(("contentId" = String, Path, description = "Content id")),
    request_body = PinRequest,
    responses(
        (status = 200, description = "Pin state set, wrapped in `data`", body = PinResponse),
        (status = 400, description = "newPinState is not a boolean", body = crate::error::ErrorBody),
        (status = 404, description = "No file has this content id", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn set_pin(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<PinRequest>, JsonRejection>,
) -> Result<Json<Data<PinResponse>>, AppError> {
    let cid = content_id_param(raw)?;
    let req = extract_json(body)?;
    state.service.set_pin(&cid, req.new_pin_state).await?;
    Ok(Json(Data::new(PinResponse {
        content_id: cid.to_string(),
        pinned: req.new_pin_state,
    })))
}

/// POST /content/items/removeDuplicates
#[utoipa::path(
    post,
    path = "/content/items/removeDuplicates",
    responses(
        (status = 200, description = "Pass complete, wrapped in `data`", body = DedupResponse),
        (status = 500, description = "Content store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn remove_duplicates(
    State(state): State<AppState>,
) -> Result<Json<Data<DedupResponse>>, AppError> {
    let report = state.service.remove_duplicates().await?;
    Ok(Json(Data::new(DedupResponse {
        removed: report.removed,
        failed: report.failed,
    })))
}

/// POST /content/items/synchronizeLog
#[utoipa::path(
    post,
    path = "/content/items/synchronizeLog",
    responses(
        (status = 200, description = "Pass complete, wrapped in `data`", body = SyncResponse),
        (status = 500, description = "Content store or log unavailable", body = crate::error::ErrorBody),
    ),
    tag = "content"
)]
pub async fn synchronize_log(
    State(state): State<AppState>,
) -> Result<Json<Data<SyncResponse>>, AppError> {
    let report = state.service.synchronize_log().await?;
    Ok(Json(Data::new(SyncResponse {
        attempted: report.attempted,
        reconciled: report.reconciled,
        skipped: report.skipped,
    })))
}
