//! Knowledge base endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

/// GET /api/knowledge/search?q=...&limit=...
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest(
            "Search query is required".to_string(),
        ));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let results = state.store.search(query, limit).await?;

    Ok(Json(json!({
        "query": query,
        "count": results.len(),
        "results": results,
    })))
}

/// GET /api/knowledge/categories
///
/// Categories with per-subcategory and total counts:
/// `{ "<category>": { "subcategories": { "<name>": n, ... }, "total": n } }`
pub async fn categories(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let rows = state.store.categories().await?;

    let mut grouped: BTreeMap<String, (BTreeMap<String, i64>, i64)> = BTreeMap::new();
    for row in rows {
        let entry = grouped.entry(row.category).or_default();
        let name = row.subcategory.unwrap_or_else(|| "General".to_string());
        *entry.0.entry(name).or_insert(0) += row.count;
        entry.1 += row.count;
    }

    let categories: BTreeMap<String, serde_json::Value> = grouped
        .into_iter()
        .map(|(category, (subcategories, total))| {
            (
                category,
                json!({ "subcategories": subcategories, "total": total }),
            )
        })
        .collect();

    Ok(Json(json!({ "categories": categories })))
}
