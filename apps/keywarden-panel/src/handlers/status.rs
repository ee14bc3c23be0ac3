use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

pub async fn get_status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = state.licenses.repo();
    let now = Utc::now().naive_utc();

    let total_keys = repo.count_total().await?;
    let active_keys = repo.count_active().await?;
    let used_keys = repo.count_used().await?;
    let expired_keys = repo
        .list_all()
        .await?
        .iter()
        .filter(|k| k.is_expired(now))
        .count() as i64;

    Ok(Json(json!({
        "status": "online",
        "server_time": now,
        "statistics": {
            "total_keys": total_keys,
            "active_keys": active_keys,
            "used_keys": used_keys,
            "expired_keys": expired_keys,
            "unused_keys": total_keys - used_keys,
        }
    })))
}
