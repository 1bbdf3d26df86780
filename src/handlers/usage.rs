use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::handlers::AppState;
use crate::middleware::auth::AuthenticatedUser;

/// Current quota snapshot. Reading performs the month rollover when due.
pub async fn get_usage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>> {
    let usage = state.ledger.get_usage(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": usage
    })))
}
