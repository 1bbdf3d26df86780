use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::ImageStore;
use crate::errors::{AppError, Result};
use crate::models::ProcessedImage;
use crate::storage::{BlobStore, UploadOptions, PROCESSED_FOLDER};

#[derive(Debug)]
pub struct PromoteOutcome {
    pub saved_count: usize,
    pub saved_images: Vec<ProcessedImage>,
}

/// Converts temporary images to permanent ones and cleans up the rest.
/// Every operation here is per-item best effort: a failing image is logged
/// and skipped, never fatal to its siblings.
#[derive(Clone)]
pub struct LifecycleResolver {
    blobs: Arc<dyn BlobStore>,
    images: Arc<dyn ImageStore>,
}

impl LifecycleResolver {
    pub fn new(blobs: Arc<dyn BlobStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { blobs, images }
    }

    /// Moves the matching temporary rows owned by `user_id` to permanent
    /// storage. Ids that are already saved, missing, or owned by someone
    /// else are silently skipped.
    pub async fn promote(&self, user_id: &str, image_ids: &[Uuid]) -> Result<PromoteOutcome> {
        if image_ids.is_empty() {
            return Ok(PromoteOutcome {
                saved_count: 0,
                saved_images: Vec::new(),
            });
        }

        let rows = self.images.find_temporary_owned(user_id, image_ids).await?;

        let mut saved_images = Vec::with_capacity(rows.len());
        for row in rows {
            match self.promote_one(&row).await {
                Ok(image) => saved_images.push(image),
                Err(e) => warn!(image_id = %row.id, "failed to promote image: {}", e),
            }
        }

        info!(
            user_id,
            saved = saved_images.len(),
            "promoted temporary images"
        );

        Ok(PromoteOutcome {
            saved_count: saved_images.len(),
            saved_images,
        })
    }

    /// Re-upload to the permanent folder, drop the temporary blob, then flip
    /// the row. Any step failing leaves the row in its prior state.
    async fn promote_one(&self, row: &ProcessedImage) -> Result<ProcessedImage> {
        let blob = self
            .blobs
            .upload(
                &row.image_url,
                &UploadOptions {
                    folder: PROCESSED_FOLDER.to_string(),
                    tags: vec!["jewelry".to_string(), "saved".to_string()],
                    public_id: Some(format!("saved_{}_{}", Utc::now().timestamp_millis(), row.id)),
                },
            )
            .await?;

        self.blobs.destroy(&row.public_id).await?;

        self.images
            .mark_saved(row.id, &blob.secure_url, &blob.public_id, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Deletes every temporary row for `user_id` not listed in
    /// `exclude_ids` (empty list deletes them all), blob first, then the
    /// row. Idempotent: nothing left to discard reports zero.
    pub async fn discard_remaining(&self, user_id: &str, exclude_ids: &[Uuid]) -> Result<usize> {
        let rows = self
            .images
            .find_temporary_excluding(user_id, exclude_ids)
            .await?;

        let discarded = self.remove_rows(rows).await;
        info!(user_id, discarded, "discarded temporary images");
        Ok(discarded)
    }

    /// Gallery deletion: only targets saved rows owned by the caller.
    pub async fn delete_saved(&self, user_id: &str, image_ids: &[Uuid]) -> Result<usize> {
        if image_ids.is_empty() {
            return Ok(0);
        }

        let rows = self.images.find_saved_owned(user_id, image_ids).await?;

        let deleted = self.remove_rows(rows).await;
        info!(user_id, deleted, "deleted saved images");
        Ok(deleted)
    }

    async fn remove_rows(&self, rows: Vec<ProcessedImage>) -> usize {
        let mut removed = 0;
        for row in rows {
            match self.remove_one(&row).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(image_id = %row.id, "failed to remove image: {}", e),
            }
        }
        removed
    }

    /// Blob first, then the row; a blob failure leaves the row behind so
    /// the expiry sweep can retry it later.
    async fn remove_one(&self, row: &ProcessedImage) -> Result<()> {
        self.blobs.destroy(&row.public_id).await?;
        self.images.delete(row.id).await?;
        Ok(())
    }
}
