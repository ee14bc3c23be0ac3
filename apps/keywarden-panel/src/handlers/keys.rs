use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

/// GET /keys — full listing for the management bot.
pub async fn get_all_keys(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let keys = state.licenses.repo().list_all().await?;
    let now = Utc::now().naive_utc();

    let views: Vec<_> = keys.iter().map(|k| k.to_view(now)).collect();
    Ok(Json(json!({
        "keys": views,
        "total": views.len(),
    })))
}

/// GET /keys/{value}
pub async fn get_key(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = state.licenses.find_key(&value).await?;

    Ok(Json(json!({
        "success": true,
        "key": key.to_view(Utc::now().naive_utc()),
    })))
}

/// POST /keys — create 1..=100 keys with an optional expiry window.
pub async fn create_keys(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let quantity = payload
        .get("quantity")
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| ApiError::Validation("Quantity must be a number".to_string()))
        })
        .transpose()?
        .unwrap_or(1);

    if !(1..=100).contains(&quantity) {
        return Err(ApiError::Validation(
            "Quantity must be between 1 and 100".to_string(),
        ));
    }

    let expires_in_days = payload.get("expires_in_days").and_then(|v| v.as_i64());
    let expires_in_hours = payload.get("expires_in_hours").and_then(|v| v.as_i64());

    let keys = state
        .licenses
        .create_keys(quantity as u32, expires_in_days, expires_in_hours)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} key(s) created successfully", quantity),
        "keys": keys,
    })))
}

/// PUT /keys/{value} — expiry and pause updates with field-presence semantics.
pub async fn update_key(
    State(state): State<AppState>,
    Path(value): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = state.licenses.update_key(&value, &payload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Key updated successfully",
        "key": key.to_view(Utc::now().naive_utc()),
    })))
}

/// POST /keys/{value}/reset-hwid
pub async fn reset_hwid(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = state.licenses.reset_hwid(&value).await?;

    Ok(Json(json!({
        "success": true,
        "message": "HWID reset successfully",
        "key": key.to_view(Utc::now().naive_utc()),
    })))
}

/// DELETE /keys/{value}
pub async fn delete_key(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.licenses.delete_key(&value).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Key deleted successfully",
    })))
}

/// DELETE /keys — wipe the store, reporting the removed count.
pub async fn delete_all_keys(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.licenses.delete_all().await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} key(s) deleted successfully", deleted),
    })))
}
