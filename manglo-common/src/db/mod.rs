//! Database initialization for Manglo
//!
//! Creates the SQLite database on first run, applies the schema
//! idempotently, and seeds the knowledge base when empty.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub mod models;
mod seed;

pub use seed::seed_knowledge_base;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a writer is active
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    seed::seed_knowledge_base(&pool).await?;

    Ok(pool)
}

/// Connect to an in-memory database with the full schema (test use)
pub async fn connect_memory() -> Result<SqlitePool> {
    // A pool over :memory: must hold exactly one connection, otherwise
    // each checkout would see a different empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            image_path TEXT NOT NULL,
            predicted_disease TEXT NOT NULL,
            confidence REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message TEXT NOT NULL,
            response TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_base (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            subcategory TEXT,
            keywords TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // External-content FTS5 index over the searchable knowledge columns,
    // kept in sync by triggers so ranked search never reads stale rows.
    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS knowledge_fts USING fts5(
            topic, content, keywords,
            content='knowledge_base',
            content_rowid='id'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS knowledge_base_ai AFTER INSERT ON knowledge_base BEGIN
            INSERT INTO knowledge_fts(rowid, topic, content, keywords)
            VALUES (new.id, new.topic, new.content, new.keywords);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS knowledge_base_ad AFTER DELETE ON knowledge_base BEGIN
            INSERT INTO knowledge_fts(knowledge_fts, rowid, topic, content, keywords)
            VALUES ('delete', old.id, old.topic, old.content, old.keywords);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS knowledge_base_au AFTER UPDATE ON knowledge_base BEGIN
            INSERT INTO knowledge_fts(knowledge_fts, rowid, topic, content, keywords)
            VALUES ('delete', old.id, old.topic, old.content, old.keywords);
            INSERT INTO knowledge_fts(rowid, topic, content, keywords)
            VALUES (new.id, new.topic, new.content, new.keywords);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_predictions_user ON predictions(user_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chat_history_user ON chat_history(user_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = connect_memory().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn fts_index_tracks_inserts_and_deletes() {
        let pool = connect_memory().await.unwrap();

        sqlx::query(
            "INSERT INTO knowledge_base (topic, content, category, keywords)
             VALUES ('Anthracnose', 'Fungal disease of fruit.', 'Disease Treatment', 'anthracnose fungus')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let hits: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM knowledge_fts WHERE knowledge_fts MATCH 'anthracnose'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(hits, 1);

        sqlx::query("DELETE FROM knowledge_base WHERE topic = 'Anthracnose'")
            .execute(&pool)
            .await
            .unwrap();

        let hits: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM knowledge_fts WHERE knowledge_fts MATCH 'anthracnose'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(hits, 0);
    }
}
