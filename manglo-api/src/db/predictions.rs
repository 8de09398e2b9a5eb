//! Prediction history queries

use manglo_common::db::models::{now_rfc3339, Prediction};
use manglo_common::Result;
use sqlx::SqlitePool;

/// Insert one prediction row; returns the new row id.
pub async fn insert_prediction(
    pool: &SqlitePool,
    user_id: i64,
    image_path: &str,
    predicted_disease: &str,
    confidence: f64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO predictions (user_id, image_path, predicted_disease, confidence, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(image_path)
    .bind(predicted_disease)
    .bind(confidence)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All predictions for a user, most recent first
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, Prediction>(
        "SELECT id, user_id, image_path, predicted_disease, confidence, created_at
         FROM predictions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
