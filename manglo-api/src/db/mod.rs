//! Database access for manglo-api
//!
//! Thin parameterized read/insert helpers over the shared schema; no
//! transactions span multiple pipeline components.

pub mod chat_history;
pub mod predictions;
pub mod sessions;
pub mod users;
