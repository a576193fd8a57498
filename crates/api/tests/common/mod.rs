#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use pixelmill_api::config::ServerConfig;
use pixelmill_api::engine::poller::{PollerContext, PollerSupervisor};
use pixelmill_api::routes;
use pixelmill_api::state::AppState;
use pixelmill_api::storage::LocalStorage;
use pixelmill_db::models::job::Job;
use pixelmill_db::models::settings::UpsertSettings;
use pixelmill_db::repositories::{JobRepo, SettingsRepo};

/// Build a test `ServerConfig` pointing at a stub backend, with a
/// millisecond poll interval so completion tests finish quickly.
pub fn test_config(runpod_base_url: &str, data_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        data_dir,
        runpod_base_url: runpod_base_url.to_string(),
        poll_interval: Duration::from_millis(20),
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool and stub backend URL.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses. Returns the storage
/// alongside the router so tests can assert on persisted files.
pub async fn build_test_app(pool: PgPool, runpod_base_url: &str) -> (Router, Arc<LocalStorage>) {
    let data_dir = std::env::temp_dir().join(format!("pixelmill-test-{}", uuid::Uuid::new_v4()));
    let storage = Arc::new(LocalStorage::init(&data_dir).await.unwrap());

    let config = Arc::new(test_config(runpod_base_url, data_dir));
    let http = reqwest::Client::new();

    let poller = Arc::new(PollerSupervisor::new(PollerContext {
        pool: pool.clone(),
        config: Arc::clone(&config),
        storage: Arc::clone(&storage),
        http: http.clone(),
    }));

    let state = AppState {
        pool,
        config,
        storage: Arc::clone(&storage),
        http,
        poller,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .nest_service("/results", ServeDir::new(storage.results_dir()))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    (app, storage)
}

// ---------------------------------------------------------------------------
// Stub RunPod backend
// ---------------------------------------------------------------------------

/// Serve a stub backend router on an ephemeral port and return its
/// base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

/// A backend that accepts every submission and always reports the
/// given status body.
pub fn stub_backend(status_body: serde_json::Value) -> Router {
    let body = Arc::new(status_body);
    Router::new()
        .route(
            "/{endpoint}/run",
            post(|| async { axum::Json(serde_json::json!({ "id": "ext-stub-1" })) }),
        )
        .route(
            "/{endpoint}/status/{id}",
            get(move || {
                let body = Arc::clone(&body);
                async move { axum::Json((*body).clone()) }
            }),
        )
}

/// A backend whose jobs complete immediately with the given output map.
pub fn stub_completed(output: serde_json::Value) -> Router {
    stub_backend(serde_json::json!({ "status": "COMPLETED", "output": output }))
}

/// A backend whose jobs fail with the given error string.
pub fn stub_failed(error: &str) -> Router {
    stub_backend(serde_json::json!({ "status": "FAILED", "error": error }))
}

/// A backend whose jobs never finish.
pub fn stub_in_progress() -> Router {
    stub_backend(serde_json::json!({ "status": "IN_PROGRESS" }))
}

/// A backend that rejects every submission with a 500.
pub fn stub_submit_error() -> Router {
    Router::new().route(
        "/{endpoint}/run",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "worker pool exhausted") }),
    )
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Upsert backend settings for a user, mapping every catalog model to
/// the endpoint `ep-test`.
pub async fn seed_settings(pool: &PgPool, user_id: &str, poll_timeout_secs: Option<i32>) {
    SettingsRepo::upsert(
        pool,
        &UpsertSettings {
            user_id: user_id.to_string(),
            api_key: "test-key".to_string(),
            endpoints: serde_json::json!({
                "flux-image": "ep-test",
                "wan-video": "ep-test",
                "sonic-avatar": "ep-test",
            }),
            poll_timeout_secs,
        },
    )
    .await
    .unwrap();
}

/// Poll the job row until it reaches a terminal state. Panics after
/// five seconds.
pub async fn wait_until_terminal(pool: &PgPool, job_id: uuid::Uuid) -> Job {
    for _ in 0..250 {
        let job = JobRepo::find_by_id(pool, job_id).await.unwrap().unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not reach a terminal state in time");
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get_req(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
