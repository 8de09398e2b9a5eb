//! Chat history queries

use manglo_common::db::models::{now_rfc3339, ChatExchange};
use manglo_common::Result;
use sqlx::SqlitePool;

/// Persist one finalized (message, response) exchange
pub async fn insert_exchange(
    pool: &SqlitePool,
    user_id: i64,
    message: &str,
    response: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO chat_history (user_id, message, response, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(message)
    .bind(response)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// The newest `limit` exchanges for a user, most recent first
pub async fn recent_exchanges(
    pool: &SqlitePool,
    user_id: i64,
    limit: u32,
) -> Result<Vec<ChatExchange>> {
    let rows = sqlx::query_as::<_, ChatExchange>(
        "SELECT id, user_id, message, response, created_at
         FROM chat_history WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a user's chat history; returns the number of rows removed
pub async fn clear_for_user(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM chat_history WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
