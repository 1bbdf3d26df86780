use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Local mirror of an auth-provider user. The id is the provider's opaque
/// identifier, kept as-is so webhook events line up without translation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub plan: String,
    pub monthly_usage: i32,
    pub last_usage_reset: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    /// Unknown plan strings fall back to the free tier.
    pub fn parse(s: &str) -> Self {
        match s {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

impl User {
    pub fn plan(&self) -> Plan {
        Plan::parse(&self.plan)
    }
}

/// Profile fields mirrored from an auth-provider webhook event.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}
