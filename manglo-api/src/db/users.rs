//! User account queries

use manglo_common::db::models::{now_rfc3339, User};
use manglo_common::Result;
use sqlx::SqlitePool;

/// Insert a new user; returns the new row id.
pub async fn create_user(pool: &SqlitePool, email: &str, password_hash: &str) -> Result<i64> {
    let now = now_rfc3339();
    let result = sqlx::query(
        "INSERT INTO users (email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(email)
    .bind(password_hash)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Look up a user by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use manglo_common::db::connect_memory;

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let pool = connect_memory().await.unwrap();

        let id = create_user(&pool, "farmer@example.com", "hash").await.unwrap();
        assert!(id > 0);

        let user = find_by_email(&pool, "farmer@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.password_hash, "hash");

        assert!(find_by_email(&pool, "nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let pool = connect_memory().await.unwrap();
        create_user(&pool, "farmer@example.com", "hash").await.unwrap();
        assert!(create_user(&pool, "farmer@example.com", "hash2")
            .await
            .is_err());
    }
}
