//! # Ledger Anchoring API
//!
//! - `POST /ledger/anchor/:contentId`: anchor a content id and record the
//!   proof in the stamp log. Repeat requests for an anchored id return the
//!   recorded transaction without submitting again.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use super::Data;
use crate::error::AppError;
use crate::extractors::content_id_param;
use crate::state::AppState;

/// Result of an anchoring request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnchorResponse {
    /// Transaction carrying the anchor. Empty when the ledger reported an
    /// existing anchor whose transaction could not be found.
    pub ledger_tx_id: String,
    /// Explorer URL for the transaction, absent for the empty id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
    /// `anchored`, `recovered` or `alreadyAnchored`.
    pub state: String,
}

/// Build the ledger router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ledger/anchor/:contentId", post(anchor))
}

/// POST /ledger/anchor/:contentId
#[utoipa::path(
    post,
    path = "/ledger/anchor/{contentId}",
    params(("contentId" = String, Path, description = "Content id to anchor")),
    responses(
        (status = 200, description = "Anchored, wrapped in `data`", body = AnchorResponse),
        (status = 409, description = "Already anchored and repeats are rejected", body = crate::error::ErrorBody),
        (status = 500, description = "Ledger rejected or failed", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger client not initialized", body = crate::error::ErrorBody),
    ),
    tag = "ledger"
)]
pub async fn anchor(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Data<AnchorResponse>>, AppError> {
    let cid = content_id_param(raw)?;
    let outcome = state.service.broadcast_cid(&cid).await?;
    let explorer_link = state
        .service
        .services()
        .ledger
        .explorer_link(&outcome.ledger_tx_id);
    Ok(Json(Data::new(AnchorResponse {
        ledger_tx_id: outcome.ledger_tx_id.to_string(),
        explorer_link,
        state: outcome.state.as_str().to_string(),
    })))
}
