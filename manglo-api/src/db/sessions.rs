//! Session token queries
//!
//! Login mints an opaque uuid token; logout deletes it. Tokens carry no
//! expiry; a restart-surviving table keeps users logged in.

use manglo_common::db::models::now_rfc3339;
use manglo_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a session for a user; returns the new token.
pub async fn create_session(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let token = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now_rfc3339())
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a token to its user id, if the session exists
pub async fn user_for_token(pool: &SqlitePool, token: &str) -> Result<Option<i64>> {
    let user_id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(user_id)
}

/// Delete a session (logout); missing tokens are not an error
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}
