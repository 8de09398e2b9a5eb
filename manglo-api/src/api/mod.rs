//! HTTP handlers for manglo-api

pub mod auth;
pub mod chat;
pub mod diseases;
pub mod health;
pub mod knowledge;
pub mod predict;
pub mod stream;

pub use auth::{auth_middleware, CurrentUser};
