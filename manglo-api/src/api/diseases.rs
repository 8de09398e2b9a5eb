//! Disease catalog and model metadata endpoints

use axum::{extract::State, Json};
use serde_json::json;

use crate::services::treatment_catalog::disease_info;
use crate::AppState;

/// GET /api/diseases
///
/// Info sheets for every configured class label
pub async fn diseases(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sheets: Vec<serde_json::Value> = state
        .classifier
        .labels()
        .iter()
        .map(|label| {
            let info = disease_info(label);
            json!({
                "class": label,
                "name": info.name,
                "symptoms": info.symptoms,
                "treatment": info.treatment,
                "severity": info.severity,
                "prevention": info.prevention,
            })
        })
        .collect();

    Json(json!({
        "total_classes": sheets.len(),
        "diseases": sheets,
    }))
}

/// GET /api/model/info
pub async fn model_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "model_loaded": state.classifier.is_loaded(),
        "classes": state.classifier.labels(),
        "num_classes": state.classifier.labels().len(),
        "image_size": state.normalizer.input_size(),
    }))
}
