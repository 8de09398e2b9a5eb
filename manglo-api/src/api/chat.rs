//! Blocking chat endpoints

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::api::CurrentUser;
use crate::db::chat_history;
use crate::error::{ApiError, ApiResult};
use crate::services::completion::ChatMessage;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Rebuild conversation context from stored exchanges, oldest first.
///
/// History is auxiliary: an unreadable table logs a warning and yields an
/// empty context, so the chat pipeline still answers.
pub(crate) async fn load_context(
    pool: &sqlx::SqlitePool,
    user_id: i64,
    history_limit: u32,
) -> Vec<ChatMessage> {
    let exchanges = match chat_history::recent_exchanges(pool, user_id, history_limit).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to load conversation history: {}; continuing without context", e);
            return Vec::new();
        }
    };

    // recent_exchanges returns newest first
    let mut context = Vec::with_capacity(exchanges.len() * 2);
    for exchange in exchanges.iter().rev() {
        context.push(ChatMessage::user(&exchange.message));
        context.push(ChatMessage::assistant(&exchange.response));
    }
    context
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<ChatRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    let context = load_context(&state.db, user_id, state.config.chat.history_limit).await;
    let response = state.responder.respond(&message, &context).await;

    // Persistence is best-effort; the response still goes out
    let saved = match chat_history::insert_exchange(&state.db, user_id, &message, &response).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save chat exchange: {}", e);
            false
        }
    };

    Ok(Json(json!({
        "response": response,
        "timestamp": manglo_common::db::models::now_rfc3339(),
        "saved": saved,
    })))
}

/// GET /api/chat/history
pub async fn chat_history_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = chat_history::recent_exchanges(&state.db, user_id, 50).await?;

    Ok(Json(json!({
        "count": rows.len(),
        "history": rows,
    })))
}

/// POST /api/chat/clear
pub async fn chat_clear(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = chat_history::clear_for_user(&state.db, user_id).await?;

    Ok(Json(json!({
        "message": "Chat history cleared",
        "deleted_count": deleted,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users;
    use crate::services::completion::Role;
    use manglo_common::db::connect_memory;

    #[tokio::test]
    async fn context_is_oldest_first_role_tagged_pairs() {
        let pool = connect_memory().await.unwrap();
        let user_id = users::create_user(&pool, "a@b.c", "h").await.unwrap();

        chat_history::insert_exchange(&pool, user_id, "q1", "a1").await.unwrap();
        chat_history::insert_exchange(&pool, user_id, "q2", "a2").await.unwrap();

        let context = load_context(&pool, user_id, 5).await;
        assert_eq!(context.len(), 4);
        assert_eq!(context[0].role, Role::User);
        assert_eq!(context[0].content, "q1");
        assert_eq!(context[1].role, Role::Assistant);
        assert_eq!(context[3].content, "a2");
    }

    #[tokio::test]
    async fn unreadable_history_yields_empty_context() {
        let pool = connect_memory().await.unwrap();
        let user_id = users::create_user(&pool, "a@b.c", "h").await.unwrap();
        chat_history::insert_exchange(&pool, user_id, "q", "a").await.unwrap();

        // A dead pool must not surface an error from the chat path
        pool.close().await;
        let context = load_context(&pool, user_id, 5).await;
        assert!(context.is_empty());
    }
}
