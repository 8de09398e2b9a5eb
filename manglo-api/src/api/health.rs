//! Health check endpoint

use axum::{extract::State, Json};
use serde_json::json;

use crate::AppState;

/// GET /health
///
/// Reports overall status plus database reachability and classifier
/// availability. Always 200; degraded dependencies show in the body.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "unreachable",
    };

    Json(json!({
        "status": "healthy",
        "module": "manglo-api",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "model": if state.classifier.is_loaded() { "loaded" } else { "unavailable" },
    }))
}
