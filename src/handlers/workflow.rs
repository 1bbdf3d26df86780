use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::handlers::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::workflow::{GenerateParams, WorkflowState};
use crate::storage::{UploadOptions, UPLOADS_FOLDER};

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub image_url: String,
}

/// Persist a source product photo so the workflow can reference it by
/// public id. The provider fetches the URL itself.
pub async fn upload_source(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UploadRequest>,
) -> Result<Json<Value>> {
    if request.image_url.trim().is_empty() {
        return Err(AppError::Validation("Image URL is required".to_string()));
    }

    let blob = state
        .blobs
        .upload(
            &request.image_url,
            &UploadOptions {
                folder: UPLOADS_FOLDER.to_string(),
                tags: vec!["jewelry".to_string(), "original".to_string()],
                public_id: Some(format!("upload_{}", Utc::now().timestamp_millis())),
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, public_id = %blob.public_id, "source image uploaded");

    Ok(Json(json!({
        "success": true,
        "public_id": blob.public_id,
        "url": blob.secure_url
    })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub source_public_id: String,
    pub style_id: String,
    pub size_id: String,
}

/// Run the generation workflow. Quota exhaustion is a distinct UI state,
/// not a generic error.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>> {
    let params = GenerateParams {
        user_id: user.id.clone(),
        source_public_id: request.source_public_id,
        style_id: request.style_id,
        size_id: request.size_id,
    };

    match state.workflow.generate(&params).await {
        Ok(outcome) => Ok(Json(json!({
            "success": true,
            "state": outcome.state,
            "processed_count": outcome.processed_count,
            "images": outcome.images,
            "is_temporary": true,
            "usage": outcome.usage
        }))),
        Err(AppError::QuotaExhausted) => {
            let usage = state.ledger.get_usage(&user.id).await.ok();
            Ok(Json(json!({
                "success": false,
                "state": WorkflowState::UsageLimit,
                "error": "No images remaining in your monthly quota",
                "usage": usage
            })))
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub image_ids: Vec<Uuid>,
}

/// Promote the selected temporaries, then discard the rest of the batch.
pub async fn save_selected(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SaveRequest>,
) -> Result<Json<Value>> {
    let outcome = state
        .workflow
        .resolve_keep(&user.id, &request.image_ids)
        .await?;

    Ok(Json(json!({
        "success": true,
        "state": outcome.state,
        "saved_count": outcome.saved_count,
        "discarded_count": outcome.discarded_count,
        "saved_images": outcome.saved_images,
        "usage": outcome.usage,
        "message": format!(
            "Successfully saved {} images and discarded {} temporary images",
            outcome.saved_count, outcome.discarded_count
        )
    })))
}

/// Discard the entire pending batch.
pub async fn discard_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>> {
    let outcome = state.workflow.resolve_discard_all(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "state": outcome.state,
        "discarded_count": outcome.discarded_count,
        "usage": outcome.usage,
        "message": format!(
            "Successfully discarded {} temporary images",
            outcome.discarded_count
        )
    })))
}
