//! # stamp-api: HTTP Surface for the Stamp Service
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |--------|--------|--------|
//! | `/content/*` | [`routes::content`] | Stamped directory, dedup, log sync |
//! | `/ledger/*` | [`routes::ledger`] | Anchoring |
//! | `/openapi.json` | [`openapi`] | API document |
//! | `/health/*` | this module, [`middleware::metrics`] | Probes and counters |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → track_requests → Handler
//! ```

pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health routes (`/health/*`) sit outside the middleware so probe and
/// metrics traffic does not show up in request counters.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::content::router(state.config.upload_max_bytes))
        .merge(routes::ledger::router())
        .merge(openapi::router())
        .layer(from_fn_with_state(
            state.metrics.clone(),
            middleware::metrics::track_requests,
        ))
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route(
            "/health/metrics",
            axum::routing::get(middleware::metrics::metrics_json),
        )
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the ledger client has loaded network parameters.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.service.services().ledger.is_initialized() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "ledger not initialized")
    }
}
