use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

/// POST /webhook — the management bot points key events at its own endpoint.
pub async fn set_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(url) = payload.get("url").and_then(|v| v.as_str()) else {
        return Err(ApiError::Validation("Webhook URL is required".to_string()));
    };

    state.webhooks.set_url(url.to_string()).await;

    Ok(Json(json!({
        "success": true,
        "message": "Webhook configured successfully",
    })))
}
