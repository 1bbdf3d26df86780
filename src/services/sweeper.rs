use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::database::ImageStore;
use crate::errors::Result;
use crate::storage::BlobStore;

const SWEEP_BATCH_LIMIT: i64 = 100;

/// Background reconciliation for temporary images nobody resolved: anything
/// past its expiry gets its blob destroyed and its row deleted. Runs
/// forever on an interval; each pass is per-item best effort.
pub struct ExpirySweeper {
    images: Arc<dyn ImageStore>,
    blobs: Arc<dyn BlobStore>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(images: Arc<dyn ImageStore>, blobs: Arc<dyn BlobStore>, interval: Duration) -> Self {
        Self {
            images,
            blobs,
            interval,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "expired temporary images removed"),
                Err(e) => error!("expiry sweep failed: {}", e),
            }
        }
    }

    /// One pass over expired rows. A blob that cannot be destroyed keeps
    /// its row so the next pass retries it.
    pub async fn sweep_once(&self) -> Result<usize> {
        let expired = self
            .images
            .find_expired(Utc::now(), SWEEP_BATCH_LIMIT)
            .await?;

        let mut swept = 0;
        for row in expired {
            if let Err(e) = self.blobs.destroy(&row.public_id).await {
                warn!(image_id = %row.id, "could not destroy expired blob: {}", e);
                continue;
            }
            match self.images.delete(row.id).await {
                Ok(_) => swept += 1,
                Err(e) => warn!(image_id = %row.id, "could not delete expired row: {}", e),
            }
        }

        Ok(swept)
    }
}
