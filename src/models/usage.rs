use serde::Serialize;

use crate::models::Plan;

/// Point-in-time view of a user's monthly quota, shaped for the usage card.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub current_usage: i32,
    pub max_usage: i32,
    pub remaining: i32,
    pub plan: Plan,
    pub progress_percentage: f64,
    pub is_at_limit: bool,
    pub is_approaching_limit: bool,
    pub days_until_reset: i64,
    pub reset_date: String,
}

impl UsageSnapshot {
    pub fn compute(
        current_usage: i32,
        max_usage: i32,
        plan: Plan,
        days_until_reset: i64,
        reset_date: String,
    ) -> Self {
        let remaining = (max_usage - current_usage).max(0);
        let progress = if max_usage > 0 {
            (current_usage as f64 / max_usage as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        UsageSnapshot {
            current_usage,
            max_usage,
            remaining,
            plan,
            progress_percentage: progress,
            is_at_limit: current_usage >= max_usage,
            // 80% of the ceiling counts as approaching
            is_approaching_limit: current_usage as f64 >= max_usage as f64 * 0.8,
            days_until_reset,
            reset_date,
        }
    }
}
