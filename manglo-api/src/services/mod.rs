//! Pipeline services for manglo-api
//!
//! The prediction path (normalize → classify → recommend) and the chat
//! path (remote completion with knowledge-grounded fallback, blocking and
//! streamed) live here; HTTP handlers in `crate::api` stay thin.

pub mod chat_responder;
pub mod classifier;
pub mod completion;
pub mod image_normalizer;
pub mod knowledge_store;
pub mod stream_relay;
pub mod treatment_catalog;

use thiserror::Error;

/// Errors from the image prediction path
#[derive(Debug, Error)]
pub enum PredictError {
    /// Input bytes are not a decodable image; rejected, no retry
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// The classifier never loaded at startup; fails identically until restart
    #[error("Classifier model is not loaded")]
    ModelUnavailable,

    /// Unexpected failure during tensor construction or the forward pass
    #[error("Inference failed: {0}")]
    Inference(String),
}
