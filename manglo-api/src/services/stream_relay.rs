//! Streaming chat relay
//!
//! Same TRY_REMOTE/FALLBACK decision logic as `ChatResponder`, delivered
//! incrementally: remote fragments are forwarded in arrival order while
//! being accumulated; on remote failure (before the first byte or
//! mid-stream) the fallback text is emitted in small configured chunks to
//! preserve the streaming shape. Exactly one terminal marker is emitted
//! per exchange, and the full accumulated pair is persisted once, after
//! the marker, best-effort.

use manglo_common::config::ChatConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use super::chat_responder::ChatResponder;
use super::completion::ChatMessage;

/// One frame of the outbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A text fragment; framing/escaping happens at the wire layer
    Content(String),
    /// Terminal marker, exactly one per exchange
    Done,
}

pub struct StreamRelay {
    responder: Arc<ChatResponder>,
    pool: SqlitePool,
    config: ChatConfig,
}

impl StreamRelay {
    pub fn new(responder: Arc<ChatResponder>, pool: SqlitePool, config: ChatConfig) -> Self {
        Self {
            responder,
            pool,
            config,
        }
    }

    /// Run one streamed exchange, forwarding frames into `out`.
    ///
    /// A closed `out` channel (client went away) stops forwarding but the
    /// accumulated text is still persisted, best-effort.
    pub async fn run(
        &self,
        user_id: i64,
        message: String,
        context: Vec<ChatMessage>,
        out: mpsc::Sender<StreamFrame>,
    ) {
        let messages = self.responder.build_messages(&message, &context);

        let (tx, mut rx) = mpsc::channel::<String>(32);
        let backend = self.responder.backend();
        let remote = tokio::spawn(async move { backend.complete_stream(&messages, tx).await });

        let mut full = String::new();
        let mut client_gone = false;

        // Drain remote fragments; the channel closes when the backend task
        // finishes or fails
        while let Some(fragment) = rx.recv().await {
            full.push_str(&fragment);
            if !client_gone && out.send(StreamFrame::Content(fragment)).await.is_err() {
                client_gone = true;
            }
        }

        let remote_ok = matches!(remote.await, Ok(Ok(()))) && !full.is_empty();

        if !remote_ok {
            if full.is_empty() {
                warn!("Remote stream produced no output; emitting knowledge fallback");
            } else {
                warn!("Remote stream failed mid-exchange; appending knowledge fallback");
            }

            let fallback = self.responder.fallback(&message).await;
            for chunk in chunk_chars(&fallback, self.config.fallback_chunk_chars) {
                full.push_str(&chunk);
                if !client_gone && out.send(StreamFrame::Content(chunk)).await.is_err() {
                    client_gone = true;
                }
                if !client_gone && self.config.fallback_chunk_interval_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(
                        self.config.fallback_chunk_interval_ms,
                    ))
                    .await;
                }
            }
        }

        if !client_gone {
            let _ = out.send(StreamFrame::Done).await;
        }

        // Persist only after the response is finalized and the terminal
        // marker has gone out
        if !full.is_empty() {
            if let Err(e) =
                crate::db::chat_history::insert_exchange(&self.pool, user_id, &message, &full).await
            {
                warn!("Failed to persist streamed exchange: {}", e);
            }
        }
    }
}

/// Split text into chunks of at most `size` characters (UTF-8 safe)
fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if current.chars().count() >= size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
