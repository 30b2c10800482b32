use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use filmlog::config::Config;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Id, Record};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// (span name, field, value) for every `Span::record` call.
type Recorded = Arc<Mutex<Vec<(String, String, String)>>>;

#[derive(Clone, Default)]
struct RecordCapture {
    recorded: Recorded,
}

struct FieldCollector<'a> {
    span: &'a str,
    out: &'a mut Vec<(String, String, String)>,
}

impl Visit for FieldCollector<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.out.push((
            self.span.to_string(),
            field.name().to_string(),
            format!("{value:?}"),
        ));
    }
}

impl<S> Layer<S> for RecordCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let name = ctx.span(id).map_or("?", |span| span.name());
        let mut out = self.recorded.lock().unwrap();
        values.record(&mut FieldCollector {
            span: name,
            out: &mut out,
        });
    }
}

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "test-secret".to_string();
    let state = filmlog::api::create_app_state(config, None)
        .await
        .expect("Failed to create app state");
    filmlog::api::router(state)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_authenticated_user_is_recorded_on_request_span() {
    let capture = RecordCapture::default();
    let recorded = capture.recorded.clone();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture));

    let app = spawn_app().await;

    let (status, body) = call(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({"email": "span@example.com", "password": "secret1", "name": "S"})
                    .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_i64().unwrap();

    assert!(
        recorded.lock().unwrap().iter().all(|(_, field, _)| field != "user_id"),
        "public routes must not record a user"
    );

    let (status, _) = call(
        &app,
        Request::builder()
            .uri("/api/watchlist")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let recorded = recorded.lock().unwrap();
    assert!(
        recorded
            .iter()
            .any(|(span, field, value)| span == "request"
                && field == "user_id"
                && *value == user_id.to_string()),
        "user_id not recorded on the request span: {recorded:?}"
    );
}

#[tokio::test]
async fn test_api_responses_are_not_cacheable() {
    let app = spawn_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}
