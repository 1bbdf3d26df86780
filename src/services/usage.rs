use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::sync::Arc;

use crate::database::UserStore;
use crate::errors::{AppError, Result};
use crate::models::{Plan, UsageSnapshot, User};

/// Monthly image ceilings per plan tier.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub free: i32,
    pub pro: i32,
}

impl PlanLimits {
    pub fn ceiling(&self, plan: Plan) -> i32 {
        match plan {
            Plan::Free => self.free,
            Plan::Pro => self.pro,
        }
    }
}

/// Tracks each user's generated-image count for the current calendar month.
/// Reads perform the month rollover themselves; charging never checks the
/// ceiling, callers bound the count via `get_usage` first.
#[derive(Clone)]
pub struct QuotaLedger {
    users: Arc<dyn UserStore>,
    limits: PlanLimits,
}

impl QuotaLedger {
    pub fn new(users: Arc<dyn UserStore>, limits: PlanLimits) -> Self {
        Self { users, limits }
    }

    /// Read-with-side-effect: a stale `last_usage_reset` zeroes the counter
    /// in the same storage round trip.
    pub async fn get_usage(&self, user_id: &str) -> Result<UsageSnapshot> {
        let now = Utc::now();
        let user = self
            .users
            .reset_usage_if_stale(user_id, month_start(now))
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(self.snapshot_for(&user, now))
    }

    /// Increments the stored counter by `count`. Zero is a no-op that still
    /// reports the current usage.
    pub async fn charge(&self, user_id: &str, count: i32) -> Result<i32> {
        if count < 0 {
            return Err(AppError::Validation(
                "Usage charge count must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        if count == 0 {
            let user = self
                .users
                .reset_usage_if_stale(user_id, month_start(now))
                .await?
                .ok_or(AppError::NotFound)?;
            return Ok(user.monthly_usage);
        }

        self.users
            .charge_usage(user_id, count, month_start(now))
            .await?
            .ok_or(AppError::NotFound)
    }

    fn snapshot_for(&self, user: &User, now: DateTime<Utc>) -> UsageSnapshot {
        let plan = user.plan();
        UsageSnapshot::compute(
            user.monthly_usage,
            self.limits.ceiling(plan),
            plan,
            days_until_reset(now),
            format_reset_date(now),
        )
    }
}

/// First instant of the month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// First instant of the month after `now`.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Days until the next month boundary, rounded up.
pub fn days_until_reset(now: DateTime<Utc>) -> i64 {
    let secs = (next_month_start(now) - now).num_seconds();
    (secs + 86_399) / 86_400
}

pub fn format_reset_date(now: DateTime<Utc>) -> String {
    next_month_start(now).format("%B %-d, %Y").to_string()
}
