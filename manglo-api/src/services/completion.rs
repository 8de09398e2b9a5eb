//! Remote completion backend
//!
//! `CompletionBackend` abstracts the remote LLM call so the chat pipeline
//! can be exercised with scripted backends in tests. The production
//! implementation talks to the OpenRouter chat-completions API, blocking
//! or streamed. Every non-success condition (network error, non-2xx,
//! timeout, malformed body) maps to `CompletionError`; callers fall back,
//! never retry.

use async_trait::async_trait;
use futures::StreamExt;
use manglo_common::config::ChatConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Remote completion errors. All variants are equivalent to the caller:
/// the chat pipeline switches to its fallback branch without retrying.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed response body: {0}")]
    Parse(String),
}

/// Completion service abstraction
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One-shot completion of the full message list
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;

    /// Streamed completion: push text fragments into `sender` as they
    /// arrive. A closed receiver means the caller went away; stop quietly.
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        sender: mpsc::Sender<String>,
    ) -> Result<(), CompletionError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Byte-level buffer for the line-delimited stream wire format.
///
/// Splitting happens on raw bytes and decoding on complete lines only, so
/// a multibyte UTF-8 sequence straddling two network chunks is never
/// decoded in halves.
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Pop the next complete line, trimmed, if one has fully arrived
    fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

/// OpenRouter chat-completions client
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    config: ChatConfig,
}

impl OpenRouterClient {
    pub fn new(config: ChatConfig) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CompletionError::NotConfigured)
    }

    async fn send_request(
        &self,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let key = self.api_key()?;
        let payload = CompletionRequest {
            model: &self.config.model,
            messages,
            stream,
            temperature: 0.7,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(key)
            .header("HTTP-Referer", "http://localhost:5000")
            .header("X-Title", "Mango Disease Management Assistant")
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(status.as_u16(), body));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let response = self.send_request(messages, false).await?;

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| CompletionError::Parse("no choices in response".to_string()))?;

        Ok(content)
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        sender: mpsc::Sender<String>,
    ) -> Result<(), CompletionError> {
        let response = self.send_request(messages, true).await?;

        let mut bytes = response.bytes_stream();
        let mut buffer = LineBuffer::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| CompletionError::Network(e.to_string()))?;
            buffer.push(&chunk);

            // The wire format is line-delimited: `data: <json>` per event
            while let Some(line) = buffer.next_line() {
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };

                if data == "[DONE]" {
                    return Ok(());
                }

                let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) else {
                    debug!("Skipping unparseable stream chunk");
                    continue;
                };

                let fragment = parsed
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.clone())
                    .unwrap_or_default();

                if !fragment.is_empty() && sender.send(fragment).await.is_err() {
                    // Receiver dropped: the relay stopped listening
                    return Ok(());
                }
            }
        }

        // Upstream closed without a terminal marker; treat as complete
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let client = OpenRouterClient::new(ChatConfig::default()).unwrap();
        let result = client.complete(&[ChatMessage::user("hello")]).await;
        assert!(matches!(result, Err(CompletionError::NotConfigured)));
    }

    #[test]
    fn stream_chunk_parses_delta_content() {
        let data = r#"{"choices":[{"delta":{"content":"Use "}}]}"#;
        let parsed: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Use "));
    }

    #[test]
    fn line_buffer_keeps_multibyte_sequences_split_across_chunks_intact() {
        let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"mångó trèés\"}}]}\n";
        let bytes = payload.as_bytes();
        // Cut inside the two-byte encoding of 'å'
        let split = payload.find('å').unwrap() + 1;

        let mut buffer = LineBuffer::new();
        buffer.push(&bytes[..split]);
        assert!(buffer.next_line().is_none());

        buffer.push(&bytes[split..]);
        let line = buffer.next_line().unwrap();
        let data = line.strip_prefix("data: ").unwrap();
        let parsed: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].delta.content.as_deref(),
            Some("mångó trèés")
        );
        assert!(!line.contains('\u{FFFD}'));
    }

    #[test]
    fn line_buffer_yields_each_complete_line_once() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"data: one\ndata: two\ndata: thr");
        assert_eq!(buffer.next_line().as_deref(), Some("data: one"));
        assert_eq!(buffer.next_line().as_deref(), Some("data: two"));
        assert!(buffer.next_line().is_none());

        buffer.push(b"ee\n");
        assert_eq!(buffer.next_line().as_deref(), Some("data: three"));
    }
}
