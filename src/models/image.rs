use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_TEMPORARY: &str = "temporary";
pub const STATUS_SAVED: &str = "saved";

/// A generated background variant persisted to blob storage. Rows start out
/// `temporary` with an expiry and either get promoted to `saved` or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub id: Uuid,
    pub user_id: String,
    pub image_url: String,
    pub public_id: String,
    pub style: String,
    pub size: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub saved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a processed-image row.
#[derive(Debug, Clone)]
pub struct NewProcessedImage {
    pub user_id: String,
    pub image_url: String,
    pub public_id: String,
    pub style: String,
    pub size: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub saved_at: Option<DateTime<Utc>>,
}
