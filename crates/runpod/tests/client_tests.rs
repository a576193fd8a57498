//! Integration tests for [`RunpodClient`] against a stub backend.
//!
//! Each test spins up a local axum server on an ephemeral port that
//! plays the role of the RunPod serverless API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pixelmill_runpod::{RunpodClient, RunpodError, RunpodStatus};
use serde_json::json;

/// Bind a stub backend on an ephemeral port and return its base URL.
async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> RunpodClient {
    RunpodClient::with_http(reqwest::Client::new(), base_url, "test-key")
        .with_poll_interval(Duration::from_millis(20))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_returns_external_id() {
    let app = Router::new().route(
        "/{endpoint}/run",
        post(|Path(endpoint): Path<String>, Json(body): Json<serde_json::Value>| async move {
            assert_eq!(endpoint, "ep-img");
            assert_eq!(body["input"]["prompt"], "a cat");
            Json(json!({ "id": "ext-123", "status": "IN_QUEUE" }))
        }),
    );
    let base = spawn_stub(app).await;

    let id = client(&base)
        .submit("ep-img", &json!({ "prompt": "a cat" }))
        .await
        .unwrap();
    assert_eq!(id, "ext-123");
}

#[tokio::test]
async fn submit_non_2xx_is_api_error() {
    let app = Router::new().route(
        "/{endpoint}/run",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let base = spawn_stub(app).await;

    let err = client(&base)
        .submit("ep-img", &json!({}))
        .await
        .unwrap_err();
    match err {
        RunpodError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_non_string_id_is_protocol_violation() {
    let app = Router::new().route(
        "/{endpoint}/run",
        post(|| async { Json(json!({ "id": 42 })) }),
    );
    let base = spawn_stub(app).await;

    let err = client(&base)
        .submit("ep-img", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, RunpodError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn submit_missing_id_is_protocol_violation() {
    let app = Router::new().route(
        "/{endpoint}/run",
        post(|| async { Json(json!({ "status": "IN_QUEUE" })) }),
    );
    let base = spawn_stub(app).await;

    let err = client(&base)
        .submit("ep-img", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, RunpodError::Protocol(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_status_parses_known_states() {
    let app = Router::new().route(
        "/{endpoint}/status/{id}",
        get(|| async { Json(json!({ "status": "IN_PROGRESS" })) }),
    );
    let base = spawn_stub(app).await;

    let poll = client(&base).get_status("ep-img", "ext-1").await.unwrap();
    assert_eq!(poll.status, RunpodStatus::InProgress);
    assert!(poll.output.is_none());
}

#[tokio::test]
async fn unknown_status_is_protocol_violation() {
    let app = Router::new().route(
        "/{endpoint}/status/{id}",
        get(|| async { Json(json!({ "status": "PAUSED" })) }),
    );
    let base = spawn_stub(app).await;

    let err = client(&base)
        .get_status("ep-img", "ext-1")
        .await
        .unwrap_err();
    assert!(matches!(err, RunpodError::Protocol(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// wait_for_completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wait_returns_output_after_queue_progression() {
    // IN_QUEUE -> IN_PROGRESS -> COMPLETED over successive polls.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_handler = Arc::clone(&calls);
    let app = Router::new().route(
        "/{endpoint}/status/{id}",
        get(move || {
            let calls = Arc::clone(&calls_handler);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let body = match n {
                    0 => json!({ "status": "IN_QUEUE" }),
                    1 => json!({ "status": "IN_PROGRESS" }),
                    _ => json!({ "status": "COMPLETED", "output": { "image": "abc" } }),
                };
                Json(body)
            }
        }),
    );
    let base = spawn_stub(app).await;

    let output = client(&base)
        .wait_for_completion("ep-img", "ext-1", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(output.unwrap()["image"], "abc");
    assert!(calls.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn failed_status_preserves_backend_error_verbatim() {
    let app = Router::new().route(
        "/{endpoint}/status/{id}",
        get(|| async { Json(json!({ "status": "FAILED", "error": "oom" })) }),
    );
    let base = spawn_stub(app).await;

    let err = client(&base)
        .wait_for_completion("ep-img", "ext-1", Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        RunpodError::BackendFailed(msg) => assert_eq!(msg, "oom"),
        other => panic!("expected BackendFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn timeout_raised_within_one_extra_interval() {
    let app = Router::new().route(
        "/{endpoint}/status/{id}",
        get(|| async { Json(json!({ "status": "IN_PROGRESS" })) }),
    );
    let base = spawn_stub(app).await;

    let timeout = Duration::from_millis(200);
    let started = std::time::Instant::now();
    let err = client(&base)
        .wait_for_completion("ep-img", "ext-1", timeout)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, RunpodError::Timeout { .. }), "got {err:?}");
    // Bound: timeout + one poll interval, plus scheduling slack.
    assert!(
        elapsed < timeout + Duration::from_millis(200),
        "took {elapsed:?}"
    );
}
