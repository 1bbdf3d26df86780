use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::handlers::AppState;

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(state.database.pool())
        .await?;

    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    })))
}
