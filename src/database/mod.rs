use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewProcessedImage, ProcessedImage, User, UserProfile};

pub mod queries;

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Pool that connects on first use. Router-level tests build state with
    /// this so nothing dials the database until a query actually runs.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// Persistence seam for the mirrored user table. The usage mutations are
/// single conditional statements so concurrent requests for the same user
/// cannot lose a month rollover or double-apply it.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<User>>;

    /// Resets `monthly_usage` to 0 when `last_usage_reset` predates
    /// `month_start`, in the same statement that reads the row back.
    async fn reset_usage_if_stale(
        &self,
        user_id: &str,
        month_start: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// Increments the usage counter, folding in the stale-month reset.
    /// Returns the new counter value, or None when the user is missing.
    async fn charge_usage(
        &self,
        user_id: &str,
        count: i32,
        month_start: DateTime<Utc>,
    ) -> Result<Option<i32>>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn delete(&self, user_id: &str) -> Result<bool>;
}

/// Persistence seam for processed-image rows.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn insert(&self, image: &NewProcessedImage) -> Result<ProcessedImage>;

    /// Temporary rows owned by `user_id` whose id is in `ids`.
    async fn find_temporary_owned(
        &self,
        user_id: &str,
        ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>>;

    /// Temporary rows owned by `user_id` whose id is NOT in `exclude_ids`.
    /// An empty exclusion list matches every temporary row.
    async fn find_temporary_excluding(
        &self,
        user_id: &str,
        exclude_ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>>;

    /// Saved rows owned by `user_id` whose id is in `ids`.
    async fn find_saved_owned(&self, user_id: &str, ids: &[Uuid]) -> Result<Vec<ProcessedImage>>;

    /// Flips a temporary row to saved with its permanent URL and public id.
    async fn mark_saved(
        &self,
        id: Uuid,
        image_url: &str,
        public_id: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<Option<ProcessedImage>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn list_saved(&self, user_id: &str) -> Result<Vec<ProcessedImage>>;

    /// Temporary rows whose expiry has passed, oldest first.
    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ProcessedImage>>;
}
