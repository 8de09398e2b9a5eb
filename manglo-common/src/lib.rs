//! # Manglo Common Library
//!
//! Shared code for the Manglo mango disease management service:
//! - Common error type
//! - Configuration loading
//! - Database initialization, schema, and row models

pub mod config;
pub mod db;
pub mod error;

pub use config::AppConfig;
pub use error::{Error, Result};
