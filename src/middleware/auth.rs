use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::handlers::AppState;

/// Identity established by the upstream auth proxy. Session validation
/// happens there; this extractor only checks the asserted id against the
/// mirrored user table.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
}

const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|header| header.to_str().ok())
            .filter(|id| !id.is_empty());

        let Some(user_id) = user_id else {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Authentication required"})),
            )
                .into_response());
        };

        match state.users.find(user_id).await {
            Ok(Some(user)) => Ok(AuthenticatedUser { id: user.id }),
            Ok(None) => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unknown user"})),
            )
                .into_response()),
            Err(_) => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Database error"})),
            )
                .into_response()),
        }
    }
}
