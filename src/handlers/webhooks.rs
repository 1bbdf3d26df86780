use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::Result;
use crate::handlers::AppState;
use crate::models::UserProfile;

#[derive(Debug, Deserialize)]
pub struct AuthWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: AuthWebhookUser,
}

#[derive(Debug, Deserialize)]
pub struct AuthWebhookUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<AuthWebhookEmail>,
}

#[derive(Debug, Deserialize)]
pub struct AuthWebhookEmail {
    pub email_address: String,
}

/// Mirrors auth-provider user events into the local table. Payload
/// signature verification happens at the provider's edge, upstream of us.
pub async fn auth_webhook(
    State(state): State<AppState>,
    Json(event): Json<AuthWebhookEvent>,
) -> Result<Json<Value>> {
    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let data = &event.data;
            let name = format!(
                "{} {}",
                data.first_name.as_deref().unwrap_or(""),
                data.last_name.as_deref().unwrap_or("")
            )
            .trim()
            .to_string();

            let profile = UserProfile {
                id: data.id.clone(),
                email: data
                    .email_addresses
                    .first()
                    .map(|e| e.email_address.clone())
                    .unwrap_or_default(),
                name,
                avatar_url: data.image_url.clone(),
            };

            state.users.upsert_profile(&profile).await?;
        }
        "user.deleted" => {
            state.users.delete(&event.data.id).await?;
        }
        other => {
            tracing::debug!(event = other, "ignoring unhandled auth webhook event");
        }
    }

    tracing::info!(
        event = %event.event_type,
        user_id = %event.data.id,
        "auth webhook processed"
    );

    Ok(Json(json!({"success": true})))
}
