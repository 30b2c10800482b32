use crate::api::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span, info, info_span};
use uuid::Uuid;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || {
            (
                StatusCode::NOT_FOUND,
                "Metrics not enabled or failed to initialize".to_string(),
            )
        },
        |handle| (StatusCode::OK, handle.render()),
    )
}

/// The per-request span opened by [`logging_middleware`].
///
/// Inner layers such as `TraceLayer` enter spans of their own, so fields
/// declared here must be recorded through this handle rather than
/// `Span::current()`.
#[derive(Debug, Clone)]
pub struct RequestSpan(pub Span);

impl RequestSpan {
    pub fn record_user(&self, user_id: i32) {
        self.0.record("user_id", user_id);
    }
}

/// Metrics label for a request path.
///
/// The middleware runs outside the router, so no `MatchedPath` is available
/// for most requests. Numeric ids and IMDb ids are folded into placeholders
/// to keep label cardinality bounded.
pub fn metrics_route(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else if is_imdb_id(segment) {
                "{external_id}"
            } else {
                segment
            }
        })
        .collect();
    segments.join("/")
}

fn is_imdb_id(segment: &str) -> bool {
    segment
        .strip_prefix("tt")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

const fn outcome(status: u16) -> &'static str {
    match status {
        500.. => "error",
        400..=499 => "client_error",
        _ => "success",
    }
}

pub async fn logging_middleware(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| metrics_route(&uri), |mp| mp.as_str().to_string());

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
        route = %route,
        user_id = tracing::field::Empty,
    );
    req.extensions_mut().insert(RequestSpan(span.clone()));

    async move {
        let response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();
        let outcome = outcome(status);

        let labels = [
            ("method", method),
            ("route", route),
            ("status", status.to_string()),
            ("outcome", outcome.to_string()),
        ];

        metrics::counter!("filmlog_http_requests_total", &labels).increment(1);
        metrics::histogram!("filmlog_http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        info!(
            event = "http_request_finished",
            duration_ms = duration_ms,
            status_code = status,
            user_agent = %user_agent,
            outcome = %outcome,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// JSON-only API headers. Responses carry per-user data, so nothing is cached.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-store"));

    response
}
