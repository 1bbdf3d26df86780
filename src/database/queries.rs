use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{ImageStore, UserStore};
use crate::errors::Result;
use crate::models::{NewProcessedImage, ProcessedImage, User, UserProfile};

const USER_COLUMNS: &str =
    "id, email, name, avatar_url, plan, monthly_usage, last_usage_reset, created_at, updated_at";

const IMAGE_COLUMNS: &str =
    "id, user_id, image_url, public_id, style, size, status, expires_at, saved_at, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn reset_usage_if_stale(
        &self,
        user_id: &str,
        month_start: DateTime<Utc>,
    ) -> Result<Option<User>> {
        // One statement, so a concurrent charge cannot interleave between
        // the staleness check and the reset.
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                monthly_usage = CASE WHEN last_usage_reset < $2 THEN 0 ELSE monthly_usage END,
                last_usage_reset = GREATEST(last_usage_reset, $2)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(month_start)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn charge_usage(
        &self,
        user_id: &str,
        count: i32,
        month_start: DateTime<Utc>,
    ) -> Result<Option<i32>> {
        // A stale row gets its counter replaced rather than incremented so a
        // charge straddling a month boundary starts the new month at `count`.
        let new_usage = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users SET
                monthly_usage = CASE WHEN last_usage_reset < $3 THEN $2 ELSE monthly_usage + $2 END,
                last_usage_reset = GREATEST(last_usage_reset, $3)
            WHERE id = $1
            RETURNING monthly_usage
            "#,
        )
        .bind(user_id)
        .bind(count)
        .bind(month_start)
        .fetch_optional(&self.pool)
        .await?;

        Ok(new_usage)
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = NOW()
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgImageStore {
    pool: PgPool,
}

impl PgImageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn insert(&self, image: &NewProcessedImage) -> Result<ProcessedImage> {
        let row = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            INSERT INTO processed_images
                (user_id, image_url, public_id, style, size, status, expires_at, saved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(&image.user_id)
        .bind(&image.image_url)
        .bind(&image.public_id)
        .bind(&image.style)
        .bind(&image.size)
        .bind(&image.status)
        .bind(image.expires_at)
        .bind(image.saved_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_temporary_owned(
        &self,
        user_id: &str,
        ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>> {
        let rows = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM processed_images
            WHERE user_id = $1 AND status = 'temporary' AND id = ANY($2)
            ORDER BY created_at
            "#
        ))
        .bind(user_id)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_temporary_excluding(
        &self,
        user_id: &str,
        exclude_ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>> {
        let rows = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM processed_images
            WHERE user_id = $1 AND status = 'temporary' AND NOT (id = ANY($2))
            ORDER BY created_at
            "#
        ))
        .bind(user_id)
        .bind(exclude_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_saved_owned(&self, user_id: &str, ids: &[Uuid]) -> Result<Vec<ProcessedImage>> {
        let rows = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM processed_images
            WHERE user_id = $1 AND status = 'saved' AND id = ANY($2)
            ORDER BY created_at
            "#
        ))
        .bind(user_id)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_saved(
        &self,
        id: Uuid,
        image_url: &str,
        public_id: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<Option<ProcessedImage>> {
        let row = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            UPDATE processed_images SET
                status = 'saved',
                image_url = $2,
                public_id = $3,
                expires_at = NULL,
                saved_at = $4
            WHERE id = $1 AND status = 'temporary'
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(image_url)
        .bind(public_id)
        .bind(saved_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM processed_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_saved(&self, user_id: &str) -> Result<Vec<ProcessedImage>> {
        let rows = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM processed_images
            WHERE user_id = $1 AND status = 'saved'
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ProcessedImage>> {
        let rows = sqlx::query_as::<_, ProcessedImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM processed_images
            WHERE status = 'temporary' AND expires_at IS NOT NULL AND expires_at < $1
            ORDER BY expires_at
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
