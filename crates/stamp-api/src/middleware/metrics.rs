//! # Request Metrics
//!
//! In-process counters for API traffic and for the stamp workflows that
//! change state: uploads stored, content ids deleted, anchors recorded.
//! Workflow counters only move on a 2xx answer. The counters live in
//! [`AppState`](crate::state::AppState) and are served as JSON at
//! `GET /health/metrics`, which sits outside this middleware and so never
//! counts itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    uploads: AtomicU64,
    deletions: AtomicU64,
    anchors: AtomicU64,
}

/// Shared request and workflow counters.
#[derive(Debug, Clone, Default)]
pub struct StampMetrics {
    counters: Arc<Counters>,
}

/// Point-in-time copy of [`StampMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub uploads: u64,
    pub deletions: u64,
    pub anchors: u64,
}

/// Route families with their own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Workflow {
    Upload,
    Delete,
    Anchor,
}

fn workflow(method: &Method, route: &str) -> Option<Workflow> {
    match (method, route) {
        (&Method::PUT, "/content/items") => Some(Workflow::Upload),
        (&Method::DELETE, "/content/items/:contentId") => Some(Workflow::Delete),
        (&Method::POST, "/ledger/anchor/:contentId") => Some(Workflow::Anchor),
        _ => None,
    }
}

impl StampMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            client_errors: c.client_errors.load(Ordering::Relaxed),
            server_errors: c.server_errors.load(Ordering::Relaxed),
            uploads: c.uploads.load(Ordering::Relaxed),
            deletions: c.deletions.load(Ordering::Relaxed),
            anchors: c.anchors.load(Ordering::Relaxed),
        }
    }

    fn record(&self, workflow: Option<Workflow>, response: &Response) {
        let c = &self.counters;
        c.requests.fetch_add(1, Ordering::Relaxed);
        let status = response.status();
        if status.is_client_error() {
            c.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            c.server_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_success() {
            let counter = match workflow {
                Some(Workflow::Upload) => &c.uploads,
                Some(Workflow::Delete) => &c.deletions,
                Some(Workflow::Anchor) => &c.anchors,
                None => return,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Count the request and, for state-changing routes, the workflow outcome.
pub async fn track_requests(
    State(metrics): State<StampMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let workflow = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|route| workflow(request.method(), route.as_str()));

    let response = next.run(request).await;
    metrics.record(workflow, &response);
    response
}

/// GET /health/metrics
pub async fn metrics_json(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
