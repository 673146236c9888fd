//! # OpenAPI Document
//!
//! Assembles the utoipa-documented handlers into one OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stamp API",
        version = "0.3.0",
        description = "Store files in a content-addressed store and anchor their content ids on a public ledger.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::content::version,
        crate::routes::content::list_items,
        crate::routes::content::upload_item,
        crate::routes::content::delete_item,
        crate::routes::content::set_pin,
        crate::routes::content::remove_duplicates,
        crate::routes::content::synchronize_log,
        crate::routes::ledger::anchor,
    ),
    components(schemas(
        stamp_core::StampedFileView,
        stamp_core::StampInfo,
        crate::error::ErrorBody,
        crate::routes::content::VersionResponse,
        crate::routes::content::UploadResponse,
        crate::routes::content::DeleteResponse,
        crate::routes::content::PinRequest,
        crate::routes::content::PinResponse,
        crate::routes::content::DedupResponse,
        crate::routes::content::SyncResponse,
        crate::routes::ledger::AnchorResponse,
    )),
    tags(
        (name = "content", description = "Stamped directory in the content store"),
        (name = "ledger", description = "Ledger anchoring"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
