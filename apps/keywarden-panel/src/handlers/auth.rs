use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

/// POST /auth — authenticate a key/HWID pair presented by end-user software.
///
/// The body is inspected for field presence rather than deserialized into a
/// struct so that missing fields yield the documented 400 instead of an
/// extractor rejection.
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(key_value), Some(hwid)) = (
        payload.get("key").and_then(|v| v.as_str()),
        payload.get("hwid").and_then(|v| v.as_str()),
    ) else {
        return Err(ApiError::Validation("Key and HWID are required".to_string()));
    };

    let outcome = state.licenses.authenticate(key_value, hwid).await?;
    let now = Utc::now().naive_utc();
    let key = &outcome.key;

    Ok(Json(json!({
        "success": true,
        "message": "Authentication successful",
        "first_use": outcome.first_use,
        "remaining_time": key.remaining_time(now),
        "key_info": {
            "key": key.key_value,
            "created_at": key.created_at,
            "first_use_at": key.first_use_at,
            "remaining_time": key.remaining_time(now),
        }
    })))
}
