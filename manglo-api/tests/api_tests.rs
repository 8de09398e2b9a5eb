//! Integration tests for the manglo-api HTTP surface
//!
//! Each test builds the full router over an in-memory seeded database and a
//! scripted completion backend, then drives it with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use manglo_api::services::completion::{ChatMessage, CompletionBackend, CompletionError};
use manglo_api::{build_router, AppState};
use manglo_common::AppConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::util::ServiceExt; // for `oneshot`

/// Backend that fails every call, forcing the knowledge fallback
struct FailingBackend;

#[async_trait]
impl CompletionBackend for FailingBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
        Err(CompletionError::Api(502, "bad gateway".to_string()))
    }

    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
        _sender: mpsc::Sender<String>,
    ) -> Result<(), CompletionError> {
        Err(CompletionError::Api(502, "bad gateway".to_string()))
    }
}

/// Backend that answers with a fixed body
struct FixedBackend(&'static str);

#[async_trait]
impl CompletionBackend for FixedBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
        Ok(self.0.to_string())
    }

    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
        sender: mpsc::Sender<String>,
    ) -> Result<(), CompletionError> {
        let _ = sender.send(self.0.to_string()).await;
        Ok(())
    }
}

/// Config pointing at a tempdir, with no model artifact and no pacing
fn test_config(dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.data_dir = dir.to_path_buf();
    config.model.artifact_path = dir.join("missing.safetensors");
    config.chat.fallback_chunk_interval_ms = 0;
    config
}

async fn setup_app(backend: Arc<dyn CompletionBackend>) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = manglo_common::db::connect_memory().await.unwrap();
    manglo_common::db::seed_knowledge_base(&pool).await.unwrap();

    let config = Arc::new(test_config(dir.path()));
    std::fs::create_dir_all(config.uploads_dir()).unwrap();

    let state = AppState::new(pool, config, backend);
    (build_router(state), dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register and log in a user; returns the session token
async fn register_and_login(app: &axum::Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/register",
            json!({ "email": email, "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            json!({ "email": email, "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    body["token"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_requires_no_auth() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "manglo-api");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["model"], "unavailable");
}

// ---------------------------------------------------------------------------
// Accounts and sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;

    let body = json!({ "email": "grower@example.com", "password": "pw123456" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/register", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request("POST", "/api/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            json!({ "email": "grower@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn check_auth_reports_session_state_without_401() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;

    // Anonymous: authenticated=false, still 200
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/check-auth")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["authenticated"], false);

    let token = register_and_login(&app, "grower@example.com").await;
    let response = app
        .oneshot(authed_request("GET", "/api/check-auth", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["authenticated"], true);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .clone()
        .oneshot(authed_request("POST", "/api/logout", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The token no longer opens protected routes
    let response = app
        .oneshot(authed_request("GET", "/api/history", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;

    for uri in [
        "/api/history",
        "/api/chat/history",
        "/api/knowledge/search?q=mango",
        "/api/diseases",
        "/api/model/info",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_round_trip_saves_history() {
    let (app, _dir) = setup_app(Arc::new(FixedBackend("Spray copper weekly."))).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/chat",
            &token,
            Some(json!({ "message": "How do I treat anthracnose?" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["response"], "Spray copper weekly.");
    assert_eq!(body["saved"], true);

    let response = app
        .oneshot(authed_request("GET", "/api/chat/history", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["history"][0]["message"], "How do I treat anthracnose?");
    assert_eq!(body["history"][0]["response"], "Spray copper weekly.");
}

#[tokio::test]
async fn chat_blank_message_is_rejected() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request(
            "POST",
            "/api/chat",
            &token,
            Some(json!({ "message": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_falls_back_when_remote_fails() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request(
            "POST",
            "/api/chat",
            &token,
            Some(json!({ "message": "anthracnose treatment" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let text = body["response"].as_str().unwrap();
    assert!(text.contains("Anthracnose"), "got: {}", text);
}

#[tokio::test]
async fn chat_clear_reports_deleted_count() {
    let (app, _dir) = setup_app(Arc::new(FixedBackend("ok"))).await;
    let token = register_and_login(&app, "grower@example.com").await;

    for message in ["first question", "second question"] {
        app.clone()
            .oneshot(authed_request(
                "POST",
                "/api/chat",
                &token,
                Some(json!({ "message": message })),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(authed_request("POST", "/api/chat/clear", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["deleted_count"], 2);

    let response = app
        .oneshot(authed_request("GET", "/api/chat/history", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
}

// ---------------------------------------------------------------------------
// Knowledge base
// ---------------------------------------------------------------------------

#[tokio::test]
async fn knowledge_search_requires_a_query() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request("GET", "/api/knowledge/search", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn knowledge_search_finds_seeded_rows() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request(
            "GET",
            "/api/knowledge/search?q=anthracnose+treatment&limit=3",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["count"].as_u64().unwrap() >= 1);
    assert_eq!(body["results"][0]["topic"], "Anthracnose");
    assert_eq!(body["results"][0]["category"], "Disease Treatment");
}

#[tokio::test]
async fn knowledge_categories_groups_and_totals() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request(
            "GET",
            "/api/knowledge/categories",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let treatment = &body["categories"]["Disease Treatment"];
    assert!(treatment["total"].as_i64().unwrap() >= 1);
    assert!(treatment["subcategories"].is_object());
}

// ---------------------------------------------------------------------------
// Diseases and model metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disease_catalog_covers_all_classes() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request("GET", "/api/diseases", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["total_classes"], 8);
    let diseases = body["diseases"].as_array().unwrap();
    assert!(diseases
        .iter()
        .any(|d| d["class"] == "Anthracnose" && d["severity"] == "High"));
    assert!(diseases
        .iter()
        .all(|d| !d["treatment"].as_str().unwrap().is_empty()));
}

#[tokio::test]
async fn model_info_reports_degraded_classifier() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request("GET", "/api/model/info", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["num_classes"], 8);
    assert_eq!(body["image_size"], 224);
    assert_eq!(body["classes"][0], "Healthy");
}

// ---------------------------------------------------------------------------
// Prediction (degraded model; the loaded-model path is covered in
// pipeline_tests.rs)
// ---------------------------------------------------------------------------

fn multipart_request(uri: &str, token: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "mangloboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 32, image::Rgb([10, 160, 30]));
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    bytes
}

#[tokio::test]
async fn predict_rejects_disallowed_file_types() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(multipart_request(
            "/api/predict",
            &token,
            "notes.txt",
            b"not an image",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_without_model_is_service_unavailable() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(multipart_request(
            "/api/predict",
            &token,
            "leaf.png",
            &sample_png(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn predict_rejects_undecodable_images() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(multipart_request(
            "/api/predict",
            &token,
            "leaf.png",
            b"these bytes are not a png",
        ))
        .await
        .unwrap();
    // Decode is checked before the model, so this is 400 even degraded
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_starts_empty() {
    let (app, _dir) = setup_app(Arc::new(FailingBackend)).await;
    let token = register_and_login(&app, "grower@example.com").await;

    let response = app
        .oneshot(authed_request("GET", "/api/history", &token, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
}
