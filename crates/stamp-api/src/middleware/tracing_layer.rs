//! # Request Tracing
//!
//! `tower_http::trace::TraceLayer` with a span per request carrying method,
//! URI and status. 5xx responses are classified as failures.

/// Build the request `TraceLayer`.
pub fn layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}
