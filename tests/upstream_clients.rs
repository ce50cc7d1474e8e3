//! Exercises the real HTTP clients against local stand-ins for the providers.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use meeting_summarizer::api::{router, RateLimiter};
use meeting_summarizer::app::build_state;
use meeting_summarizer::config::{Config, EmailConfig};
use meeting_summarizer::email::{Mailer, ResendMailer};
use meeting_summarizer::error::UpstreamError;
use meeting_summarizer::summarizer::{build_messages, OpenAIProvider, SummaryProvider};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Last request seen by a fake provider: the Authorization header and JSON body.
type Captured = Arc<Mutex<Option<(String, Value)>>>;

#[derive(Clone)]
struct FakeProvider {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    captured: Captured,
}

async fn fake_handler(
    State(fake): State<FakeProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *fake.captured.lock().unwrap() = Some((auth, body));

    if !fake.delay.is_zero() {
        tokio::time::sleep(fake.delay).await;
    }

    (fake.status, Json(fake.reply))
}

/// Starts a fake provider on an ephemeral port and returns its endpoint URL.
async fn spawn_provider(status: StatusCode, reply: Value, delay: Duration) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(None));
    let fake = FakeProvider {
        status,
        reply,
        delay,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1/endpoint", post(fake_handler))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/endpoint", addr), captured)
}

fn openai(endpoint: String, timeout: Duration) -> OpenAIProvider {
    OpenAIProvider::new(
        Some("sk-test".to_string()),
        Some(endpoint),
        "gpt-4o-mini".to_string(),
        timeout,
    )
    .unwrap()
}

fn email_config(endpoint: String) -> EmailConfig {
    EmailConfig {
        api_key: Some("re_test".to_string()),
        from: Some("Meetings <meetings@example.com>".to_string()),
        api_endpoint: endpoint,
        escape_html: false,
    }
}

#[tokio::test]
async fn openai_sends_fixed_parameters_and_extracts_completion() {
    let (endpoint, captured) = spawn_provider(
        StatusCode::OK,
        json!({
            "choices": [{"message": {"role": "assistant", "content": "- Ship Friday"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }),
        Duration::ZERO,
    )
    .await;
    let provider = openai(endpoint, Duration::from_secs(5));

    let messages = build_messages("Alice: ship Friday", Some("Bullet points"));
    let completion = provider.complete(&messages).await.unwrap();

    assert_eq!(completion.content, "- Ship Friday");
    assert_eq!(completion.usage.prompt, 10);
    assert_eq!(completion.usage.completion, 5);

    let (auth, body) = captured.lock().unwrap().clone().unwrap();
    assert_eq!(auth, "Bearer sk-test");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 1500);
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
}

#[tokio::test]
async fn openai_non_success_carries_status_and_body() {
    let (endpoint, _) = spawn_provider(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"error": {"message": "overloaded"}}),
        Duration::ZERO,
    )
    .await;
    let provider = openai(endpoint, Duration::from_secs(5));

    let messages = build_messages("notes", None);
    let err = provider.complete(&messages).await.unwrap_err();

    match err {
        UpstreamError::Status { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn openai_times_out() {
    let (endpoint, _) = spawn_provider(
        StatusCode::OK,
        json!({"choices": []}),
        Duration::from_secs(3),
    )
    .await;
    let provider = openai(endpoint, Duration::from_millis(300));

    let messages = build_messages("notes", None);
    let err = provider.complete(&messages).await.unwrap_err();

    match err {
        UpstreamError::Transport(e) => assert!(e.is_timeout()),
        other => panic!("expected transport timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn resend_sends_fixed_subject_and_wrapped_html() {
    let (endpoint, captured) =
        spawn_provider(StatusCode::OK, json!({"id": "abc-123"}), Duration::ZERO).await;
    let mailer = ResendMailer::new(&email_config(endpoint), Duration::from_secs(5)).unwrap();

    let id = mailer.send("a@b.com", "<ul><li>Ship</li></ul>").await.unwrap();
    assert_eq!(id.as_deref(), Some("abc-123"));

    let (auth, body) = captured.lock().unwrap().clone().unwrap();
    assert_eq!(auth, "Bearer re_test");
    assert_eq!(
        body,
        json!({
            "from": "Meetings <meetings@example.com>",
            "to": ["a@b.com"],
            "subject": "Meeting Summary",
            "html": "<div><ul><li>Ship</li></ul></div>"
        })
    );
}

#[tokio::test]
async fn resend_escapes_html_when_enabled() {
    let (endpoint, captured) =
        spawn_provider(StatusCode::OK, json!({"id": "abc"}), Duration::ZERO).await;
    let config = EmailConfig {
        escape_html: true,
        ..email_config(endpoint)
    };
    let mailer = ResendMailer::new(&config, Duration::from_secs(5)).unwrap();

    mailer.send("a@b.com", "<script>x</script>").await.unwrap();

    let (_, body) = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["html"], "<div>&lt;script&gt;x&lt;/script&gt;</div>");
}

#[tokio::test]
async fn resend_wrapped_and_missing_ids() {
    let (endpoint, _) = spawn_provider(
        StatusCode::OK,
        json!({"data": {"id": "msg_1"}, "error": null}),
        Duration::ZERO,
    )
    .await;
    let mailer = ResendMailer::new(&email_config(endpoint), Duration::from_secs(5)).unwrap();
    assert_eq!(
        mailer.send("a@b.com", "summary").await.unwrap().as_deref(),
        Some("msg_1")
    );

    let (endpoint, _) = spawn_provider(StatusCode::OK, json!({}), Duration::ZERO).await;
    let mailer = ResendMailer::new(&email_config(endpoint), Duration::from_secs(5)).unwrap();
    assert_eq!(mailer.send("a@b.com", "summary").await.unwrap(), None);
}

#[tokio::test]
async fn resend_provider_reported_error_fails() {
    let (endpoint, _) = spawn_provider(
        StatusCode::OK,
        json!({"data": null, "error": {"name": "validation_error", "message": "Invalid `from` field"}}),
        Duration::ZERO,
    )
    .await;
    let mailer = ResendMailer::new(&email_config(endpoint), Duration::from_secs(5)).unwrap();

    match mailer.send("a@b.com", "summary").await.unwrap_err() {
        UpstreamError::Provider(message) => assert_eq!(message, "Invalid `from` field"),
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn resend_non_success_status_fails() {
    let (endpoint, _) = spawn_provider(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({"statusCode": 422, "name": "validation_error", "message": "bad"}),
        Duration::ZERO,
    )
    .await;
    let mailer = ResendMailer::new(&email_config(endpoint), Duration::from_secs(5)).unwrap();

    assert!(matches!(
        mailer.send("a@b.com", "summary").await.unwrap_err(),
        UpstreamError::Status { status: 422, .. }
    ));
}

#[tokio::test]
async fn configured_service_summarizes_end_to_end() {
    let (llm_endpoint, _) = spawn_provider(
        StatusCode::OK,
        json!({
            "choices": [{"message": {"content": "X"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }),
        Duration::ZERO,
    )
    .await;
    let (email_endpoint, _) =
        spawn_provider(StatusCode::OK, json!({"id": "msg_1"}), Duration::ZERO).await;

    let mut config = Config::default();
    let vars = [
        ("OPENAI_API_KEY", "sk-test".to_string()),
        ("OPENAI_MODEL", "gpt-4o".to_string()),
        ("OPENAI_API_ENDPOINT", llm_endpoint),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("EMAIL_FROM", "notes@example.com".to_string()),
        ("RESEND_API_ENDPOINT", email_endpoint),
    ];
    config
        .apply_env(|key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        })
        .unwrap();

    let state = build_state(&config).unwrap();
    let limiter = RateLimiter::from_config(&config.rate_limit, &config.server);
    let app = router(state, limiter, &config.server);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/summarize")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"transcript": "notes"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"summary": "X", "model": "gpt-4o", "tokens": {"prompt": 10, "completion": 5}})
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/send-email")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": "a@b.com", "summary": "X"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"ok": true, "id": "msg_1"}));
}
