//! Streaming chat endpoint (SSE)

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Extension, Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;

use crate::api::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::services::completion::{ChatMessage, Role};
use crate::services::stream_relay::StreamFrame;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// POST /api/chat/stream
///
/// The client supplies the conversation so far; the final message is the
/// new user turn. Fragments arrive as `data: {"content": ...}` events,
/// terminated by a single `data: [DONE]`.
pub async fn chat_stream(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<StreamChatRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut messages = body.messages;
    let message = match messages.pop() {
        Some(m) if !m.content.trim().is_empty() => m.content,
        _ => return Err(ApiError::BadRequest("Messages are required".to_string())),
    };

    // Client-supplied system prompts are dropped; the relay injects its own
    let context: Vec<ChatMessage> = messages
        .into_iter()
        .filter(|m| m.role != Role::System)
        .collect();

    let (tx, mut rx) = mpsc::channel::<StreamFrame>(32);
    let relay = state.relay.clone();
    tokio::spawn(async move {
        relay.run(user_id, message, context, tx).await;
    });

    let stream = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match frame {
                StreamFrame::Content(text) => {
                    // serde_json handles quoting/escaping of the fragment
                    yield Ok(Event::default().data(json!({ "content": text }).to_string()));
                }
                StreamFrame::Done => {
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream))
}
