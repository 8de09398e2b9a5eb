//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One stored classification result
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub image_path: String,
    pub predicted_disease: String,
    pub confidence: f64,
    pub created_at: String,
}

/// One persisted (user message, assistant response) pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatExchange {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub response: String,
    pub created_at: String,
}

/// One row of curated domain text used to ground fallback chat answers
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeItem {
    pub topic: String,
    pub content: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub keywords: String,
}

/// RFC 3339 timestamp for row creation
pub fn now_rfc3339() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.to_rfc3339()
}
