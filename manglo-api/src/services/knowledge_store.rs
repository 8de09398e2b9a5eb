//! Knowledge base search
//!
//! Relevance-ranked FTS5 search over the curated mango knowledge table,
//! with a lower-recall substring fallback when ranked search matches
//! nothing. An empty result set is a valid outcome; only infrastructure
//! failures surface as `Err`, and chat callers treat those as empty with a
//! distinct log signal.

use manglo_common::db::models::KnowledgeItem;
use manglo_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct KnowledgeStore {
    pool: SqlitePool,
}

/// Category/subcategory row count, for the categories endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub subcategory: Option<String>,
    pub count: i64,
}

/// Lowercase word tokens of at least 3 characters
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_string())
        .collect()
}

impl KnowledgeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Search the knowledge base, most relevant first, at most `limit` rows.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<KnowledgeItem>> {
        let tokens = tokenize(query);

        if !tokens.is_empty() {
            let rows = self.ranked_search(&tokens, limit).await?;
            if !rows.is_empty() {
                return Ok(rows);
            }
        }

        self.substring_search(&tokens, query, limit).await
    }

    /// Primary strategy: bm25-ranked FTS5 match over topic+content+keywords
    async fn ranked_search(&self, tokens: &[String], limit: u32) -> Result<Vec<KnowledgeItem>> {
        // Quote each token so FTS5 never parses it as query syntax
        let match_expr = tokens
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "")))
            .collect::<Vec<_>>()
            .join(" OR ");

        let rows = sqlx::query_as::<_, KnowledgeItem>(
            r#"
            SELECT kb.topic, kb.content, kb.category, kb.subcategory, kb.keywords
            FROM knowledge_fts
            JOIN knowledge_base kb ON kb.id = knowledge_fts.rowid
            WHERE knowledge_fts MATCH ?
            ORDER BY bm25(knowledge_fts)
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fallback strategy: case-insensitive substring match on the first
    /// surviving token, or the first 20 characters of the raw query when
    /// nothing survived filtering. Row order is store-dependent.
    async fn substring_search(
        &self,
        tokens: &[String],
        raw_query: &str,
        limit: u32,
    ) -> Result<Vec<KnowledgeItem>> {
        let needle = tokens
            .first()
            .cloned()
            .unwrap_or_else(|| raw_query.chars().take(20).collect::<String>().to_lowercase());
        let pattern = format!("%{}%", needle);

        let rows = sqlx::query_as::<_, KnowledgeItem>(
            r#"
            SELECT topic, content, category, subcategory, keywords
            FROM knowledge_base
            WHERE topic LIKE ? OR content LIKE ? OR keywords LIKE ?
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Category/subcategory counts across the whole table
    pub async fn categories(&self) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, subcategory, COUNT(*) AS count
            FROM knowledge_base
            GROUP BY category, subcategory
            ORDER BY category, subcategory
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
