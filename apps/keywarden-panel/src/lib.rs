pub mod cli;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use services::license_service::LicenseService;
use services::webhook_service::WebhookService;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub licenses: Arc<LicenseService>,
    pub webhooks: Arc<WebhookService>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let webhooks = Arc::new(WebhookService::new());
        let licenses = Arc::new(LicenseService::new(pool.clone(), webhooks.clone()));

        Self {
            pool,
            licenses,
            webhooks,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .route("/auth", post(handlers::auth::authenticate))
        .route(
            "/keys",
            get(handlers::keys::get_all_keys)
                .post(handlers::keys::create_keys)
                .delete(handlers::keys::delete_all_keys),
        )
        .route(
            "/keys/{value}",
            get(handlers::keys::get_key)
                .put(handlers::keys::update_key)
                .delete(handlers::keys::delete_key),
        )
        .route("/keys/{value}/reset-hwid", post(handlers::keys::reset_hwid))
        .route("/webhook", post(handlers::webhook::set_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
