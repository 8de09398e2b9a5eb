//! Image prediction endpoints

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::CurrentUser;
use crate::db::predictions;
use crate::error::{ApiError, ApiResult};
use crate::services::treatment_catalog::recommendation_for;
use crate::services::PredictError;
use crate::AppState;

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::Decode(msg) => {
                ApiError::BadRequest(format!("Invalid image file: {}", msg))
            }
            PredictError::ModelUnavailable => {
                ApiError::ServiceUnavailable("Classifier model is not loaded".to_string())
            }
            PredictError::Inference(msg) => ApiError::Internal(format!("Inference failed: {}", msg)),
        }
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// POST /api/predict
///
/// Multipart upload with an `image` field. Runs the full pipeline:
/// decode/normalize, classify, attach the treatment recommendation, and
/// best-effort record the prediction.
pub async fn predict(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut image_bytes: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
            image_bytes = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = image_bytes
        .ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No image file provided".to_string()));
    }

    let extension = extension_of(&filename)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Invalid file type. Please upload PNG, JPG, JPEG, or GIF images.".to_string(),
            )
        })?;

    let tensor = state.normalizer.normalize(&bytes)?;
    let result = state.classifier.classify(&tensor)?;
    let recommendation = recommendation_for(&result.predicted_label);

    info!(
        "Prediction for user {}: {} ({:.3})",
        user_id, result.predicted_label, result.confidence
    );

    // Retain the upload so the history has something to point at. A full
    // disk must not fail the prediction.
    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
    let stored_path = state.config.uploads_dir().join(&stored_name);
    if let Err(e) = tokio::fs::write(&stored_path, &bytes).await {
        warn!("Failed to store upload {}: {}", stored_path.display(), e);
    }

    // Recording history is best-effort too
    let record_id = match predictions::insert_prediction(
        &state.db,
        user_id,
        &stored_name,
        &result.predicted_label,
        f64::from(result.confidence),
    )
    .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Failed to record prediction: {}", e);
            None
        }
    };

    Ok(Json(json!({
        "id": record_id,
        "predicted_class": result.predicted_label,
        "disease": result.predicted_label.replace('_', " "),
        "confidence": result.confidence,
        "all_probabilities": result.per_class_scores,
        "recommendations": recommendation,
    })))
}

/// GET /api/history
pub async fn history(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = predictions::list_for_user(&state.db, user_id).await?;

    Ok(Json(json!({
        "count": rows.len(),
        "history": rows,
    })))
}
