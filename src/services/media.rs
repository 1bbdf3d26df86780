use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::database::ImageStore;
use crate::errors::{AppError, Result};
use crate::models::{NewProcessedImage, ProcessedImage, STATUS_SAVED, STATUS_TEMPORARY};
use crate::services::usage::QuotaLedger;
use crate::storage::{BlobStore, UploadOptions, PROCESSED_FOLDER, TEMP_FOLDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDisposition {
    /// Pending the user's keep/discard decision; expires after the TTL.
    Temporary,
    /// Straight to the gallery; the store charges usage itself.
    Saved,
}

#[derive(Debug, Serialize)]
pub struct StoreItemOutcome {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct StoreOutcome {
    pub results: Vec<StoreItemOutcome>,
    pub stored: Vec<ProcessedImage>,
    pub processed_count: usize,
}

/// Persists generated variants into durable blob storage and records one
/// database row per blob. Each upload+record pair is one unit of work; the
/// batch is not atomic and reports per-item success.
#[derive(Clone)]
pub struct MediaStore {
    blobs: Arc<dyn BlobStore>,
    images: Arc<dyn ImageStore>,
    ledger: QuotaLedger,
    temp_ttl: Duration,
}

impl MediaStore {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        images: Arc<dyn ImageStore>,
        ledger: QuotaLedger,
        temp_ttl_secs: i64,
    ) -> Self {
        Self {
            blobs,
            images,
            ledger,
            temp_ttl: Duration::seconds(temp_ttl_secs),
        }
    }

    /// Stores each URL independently and sequentially. Generation URLs are
    /// short-lived upstream, so this runs immediately after generation.
    /// Fails only when zero items could be stored.
    pub async fn store(
        &self,
        urls: &[String],
        user_id: &str,
        style: &str,
        size: &str,
        disposition: StoreDisposition,
    ) -> Result<StoreOutcome> {
        if urls.is_empty() {
            return Err(AppError::Validation("No image URLs to store".to_string()));
        }

        let now = Utc::now();
        // Rows from one orchestrator run share this prefix in their public
        // ids; it is the only batch correlation that exists.
        let batch_stamp = now.timestamp_millis();

        let mut results = Vec::with_capacity(urls.len());
        let mut stored = Vec::new();

        for (index, url) in urls.iter().enumerate() {
            match self
                .store_one(url, user_id, style, size, disposition, batch_stamp, index, now)
                .await
            {
                Ok(image) => {
                    results.push(StoreItemOutcome {
                        index,
                        success: true,
                        error: None,
                    });
                    stored.push(image);
                }
                Err(e) => {
                    warn!(index, "failed to store generated image: {}", e);
                    results.push(StoreItemOutcome {
                        index,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let processed_count = stored.len();
        if processed_count == 0 {
            return Err(AppError::Storage(
                "Failed to store any generated images".to_string(),
            ));
        }

        // Temporary batches are charged by the orchestrator at generation
        // time; only the direct-save path pays here.
        if disposition == StoreDisposition::Saved {
            if let Err(e) = self.ledger.charge(user_id, processed_count as i32).await {
                warn!("could not update monthly usage after store: {}", e);
            }
        }

        Ok(StoreOutcome {
            results,
            stored,
            processed_count,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn store_one(
        &self,
        source_url: &str,
        user_id: &str,
        style: &str,
        size: &str,
        disposition: StoreDisposition,
        batch_stamp: i64,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<ProcessedImage> {
        let (folder, status) = match disposition {
            StoreDisposition::Temporary => (TEMP_FOLDER, STATUS_TEMPORARY),
            StoreDisposition::Saved => (PROCESSED_FOLDER, STATUS_SAVED),
        };

        let blob = self
            .blobs
            .upload(
                source_url,
                &UploadOptions {
                    folder: folder.to_string(),
                    tags: vec!["jewelry".to_string(), status.to_string()],
                    public_id: Some(format!("processed_{}_{}", batch_stamp, index)),
                },
            )
            .await?;

        let new_image = NewProcessedImage {
            user_id: user_id.to_string(),
            image_url: blob.secure_url,
            public_id: blob.public_id,
            style: style.to_string(),
            size: size.to_string(),
            status: status.to_string(),
            expires_at: match disposition {
                StoreDisposition::Temporary => Some(now + self.temp_ttl),
                StoreDisposition::Saved => None,
            },
            saved_at: match disposition {
                StoreDisposition::Temporary => None,
                StoreDisposition::Saved => Some(now),
            },
        };

        self.images.insert(&new_image).await
    }
}
