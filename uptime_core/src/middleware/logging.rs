//! Request logging for the operational endpoints

use axum::http::{Request, Response};
use axum::Router;
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::info_span;

/// Wraps every route of `router` in a `TraceLayer` that logs method, path,
/// status and latency.
pub fn with_request_logging<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_request(|request: &Request<_>, _span: &tracing::Span| {
                tracing::debug!("started processing request {} {}", request.method(), request.uri().path());
            })
            .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
                let status = response.status();
                let latency_ms = latency.as_millis();

                if status.is_success() {
                    tracing::debug!(status = status.as_u16(), latency_ms = latency_ms, "request completed");
                } else if status.is_client_error() {
                    tracing::warn!(status = status.as_u16(), latency_ms = latency_ms, "client error response");
                } else {
                    // 503 from /health lands here while a component is down
                    tracing::error!(status = status.as_u16(), latency_ms = latency_ms, "server error response");
                }
            })
            .on_failure(|error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(latency_ms = latency.as_millis(), error = ?error, "request failed");
            }),
    )
}
