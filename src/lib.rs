use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/v1/workflow/upload", post(handlers::workflow::upload_source))
        .route("/v1/workflow/generate", post(handlers::workflow::generate))
        .route("/v1/workflow/save", post(handlers::workflow::save_selected))
        .route("/v1/workflow/discard", post(handlers::workflow::discard_all))
        .route("/v1/usage", get(handlers::usage::get_usage))
        .route(
            "/v1/images",
            get(handlers::gallery::list_images).delete(handlers::gallery::delete_images),
        )
        .route("/v1/webhooks/auth", post(handlers::webhooks::auth_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
