//! manglo-api - Mango disease management backend
//!
//! REST service combining a local leaf-disease classifier with a chat
//! assistant: image prediction with treatment recommendations, account and
//! session handling, a curated knowledge base, and remote LLM chat with a
//! knowledge-grounded fallback (blocking and streamed).

pub mod api;
pub mod db;
pub mod error;
pub mod services;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use manglo_common::AppConfig;
use services::chat_responder::ChatResponder;
use services::classifier::Classifier;
use services::completion::CompletionBackend;
use services::image_normalizer::ImageNormalizer;
use services::knowledge_store::KnowledgeStore;
use services::stream_relay::StreamRelay;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub normalizer: Arc<ImageNormalizer>,
    pub classifier: Arc<Classifier>,
    pub store: KnowledgeStore,
    pub responder: Arc<ChatResponder>,
    pub relay: Arc<StreamRelay>,
}

impl AppState {
    /// Wire up all services over a connected pool and a completion backend
    pub fn new(db: SqlitePool, config: Arc<AppConfig>, backend: Arc<dyn CompletionBackend>) -> Self {
        let normalizer = Arc::new(ImageNormalizer::new(config.model.input_size));
        let classifier = Arc::new(Classifier::load(
            &config.model.artifact_path,
            config.model.labels.clone(),
        ));
        let store = KnowledgeStore::new(db.clone());
        let responder = Arc::new(ChatResponder::new(
            backend,
            store.clone(),
            config.chat.clone(),
        ));
        let relay = Arc::new(StreamRelay::new(
            responder.clone(),
            db.clone(),
            config.chat.clone(),
        ));

        Self {
            db,
            config,
            normalizer,
            classifier,
            store,
            responder,
            relay,
        }
    }
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    // Everything past login requires a valid bearer session
    let protected = Router::new()
        .route("/api/logout", post(api::auth::logout))
        .route("/api/predict", post(api::predict::predict))
        .route("/api/history", get(api::predict::history))
        .route("/api/chat", post(api::chat::chat))
        .route("/api/chat/stream", post(api::stream::chat_stream))
        .route("/api/chat/history", get(api::chat::chat_history_list))
        .route("/api/chat/clear", post(api::chat::chat_clear))
        .route("/api/knowledge/search", get(api::knowledge::search))
        .route("/api/knowledge/categories", get(api::knowledge::categories))
        .route("/api/diseases", get(api::diseases::diseases))
        .route("/api/model/info", get(api::diseases::model_info))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/register", post(api::auth::register))
        .route("/api/login", post(api::auth::login))
        .route("/api/check-auth", get(api::auth::check_auth))
        .merge(protected)
        .with_state(state)
}
