use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::handlers::AppState;
use crate::middleware::auth::AuthenticatedUser;

/// The caller's saved images, newest first.
pub async fn list_images(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>> {
    let images = state.images.list_saved(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "images": images
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteImagesRequest {
    pub image_ids: Vec<Uuid>,
}

/// Batch delete from the gallery; only saved rows owned by the caller are
/// touched, the rest of the ids are skipped.
pub async fn delete_images(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<DeleteImagesRequest>,
) -> Result<Json<Value>> {
    if request.image_ids.is_empty() {
        return Err(AppError::Validation(
            "No images selected to delete".to_string(),
        ));
    }

    let deleted_count = state
        .resolver
        .delete_saved(&user.id, &request.image_ids)
        .await?;

    Ok(Json(json!({
        "success": true,
        "deleted_count": deleted_count
    })))
}
