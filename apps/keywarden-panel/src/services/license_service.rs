use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use keywarden_db::models::key::LicenseKey;
use keywarden_db::repositories::key_repo::KeyRepository;

use crate::error::ApiError;
use crate::services::webhook_service::WebhookService;

/// Positive authentication verdict. `first_use` marks the call that bound
/// the HWID and started the expiry clock.
#[derive(Debug)]
pub struct AuthSuccess {
    pub first_use: bool,
    pub key: LicenseKey,
}

/// The key lifecycle engine: the fixed-order authentication decision
/// procedure and the administrative mutations, with their cap rules,
/// layered over the repository. All outcomes emit a webhook event.
pub struct LicenseService {
    repo: KeyRepository,
    webhooks: Arc<WebhookService>,
}

impl LicenseService {
    pub fn new(pool: SqlitePool, webhooks: Arc<WebhookService>) -> Self {
        Self {
            repo: KeyRepository::new(pool),
            webhooks,
        }
    }

    pub fn repo(&self) -> &KeyRepository {
        &self.repo
    }

    pub async fn authenticate(&self, key_value: &str, hwid: &str) -> Result<AuthSuccess, ApiError> {
        self.authenticate_at(key_value, hwid, Utc::now().naive_utc())
            .await
    }

    /// Rejection priority is fixed: invalid → inactive → paused → expired →
    /// wrong device. The first matching condition wins.
    pub async fn authenticate_at(
        &self,
        key_value: &str,
        hwid: &str,
        now: NaiveDateTime,
    ) -> Result<AuthSuccess, ApiError> {
        let key_value = key_value.to_uppercase();

        let Some(key) = self.repo.find_by_value(&key_value).await? else {
            self.webhooks
                .notify(format!("❌ Login attempt with invalid key: {}", key_value))
                .await;
            return Err(ApiError::NotFound("Invalid key".to_string()));
        };

        if !key.is_active {
            self.webhooks
                .notify(format!("❌ Login attempt with inactive key: {}", key_value))
                .await;
            return Err(ApiError::Forbidden("Inactive key".to_string()));
        }

        if key.is_paused {
            self.webhooks
                .notify(format!("❌ Login attempt with paused key: {}", key_value))
                .await;
            return Err(ApiError::Forbidden("Paused key".to_string()));
        }

        if key.is_expired(now) {
            self.webhooks
                .notify(format!("❌ Login attempt with expired key: {}", key_value))
                .await;
            return Err(ApiError::Forbidden("Expired key".to_string()));
        }

        match key.hwid.as_deref() {
            Some(bound) if bound != hwid => self.reject_wrong_device(&key_value, hwid).await,
            Some(_) => {
                self.webhooks
                    .notify(format!("✅ Successful login: {} (HWID: {})", key_value, hwid))
                    .await;
                Ok(AuthSuccess {
                    first_use: false,
                    key,
                })
            }
            None => {
                // First use: the conditional UPDATE decides the race, so only
                // one concurrent caller ever binds.
                if self.repo.bind_hwid(&key_value, hwid, now).await? {
                    self.webhooks
                        .notify(format!("✅ First use of key: {} (HWID: {})", key_value, hwid))
                        .await;
                    let mut key = key;
                    key.hwid = Some(hwid.to_string());
                    key.first_use_at = Some(now);
                    Ok(AuthSuccess {
                        first_use: true,
                        key,
                    })
                } else {
                    // Lost the bind race; re-read and judge against the winner.
                    let rebound = self.repo.find_by_value(&key_value).await?;
                    match rebound {
                        Some(key) if key.hwid.as_deref() == Some(hwid) => {
                            self.webhooks
                                .notify(format!(
                                    "✅ Successful login: {} (HWID: {})",
                                    key_value, hwid
                                ))
                                .await;
                            Ok(AuthSuccess {
                                first_use: false,
                                key,
                            })
                        }
                        Some(_) => self.reject_wrong_device(&key_value, hwid).await,
                        None => Err(ApiError::NotFound("Invalid key".to_string())),
                    }
                }
            }
        }
    }

    async fn reject_wrong_device(
        &self,
        key_value: &str,
        hwid: &str,
    ) -> Result<AuthSuccess, ApiError> {
        self.webhooks
            .notify(format!(
                "❌ Login attempt from a different device: {} (HWID: {})",
                key_value, hwid
            ))
            .await;
        Err(ApiError::Forbidden(
            "This key is already bound to another device".to_string(),
        ))
    }

    pub async fn create_keys(
        &self,
        quantity: u32,
        expires_in_days: Option<i64>,
        expires_in_hours: Option<i64>,
    ) -> Result<Vec<String>> {
        let values = self
            .repo
            .create_batch(quantity, expires_in_days, expires_in_hours)
            .await?;
        tracing::info!("Created {} license key(s)", values.len());
        Ok(values)
    }

    /// Field-presence update semantics: a key present in the body is applied
    /// even when null, fields absent from the body are untouched. Setting one
    /// expiry window clears the other, so when both appear, hours wins.
    /// Pausing past the cap is a silent no-op; resuming always applies.
    pub async fn update_key(
        &self,
        key_value: &str,
        body: &serde_json::Value,
    ) -> Result<LicenseKey, ApiError> {
        let key_value = key_value.to_uppercase();
        let Some(_) = self.repo.find_by_value(&key_value).await? else {
            return Err(ApiError::NotFound("Key not found".to_string()));
        };

        if let Some(days) = body.get("expires_in_days") {
            self.repo
                .set_expiry_days(&key_value, days.as_i64())
                .await?;
        }

        if let Some(hours) = body.get("expires_in_hours") {
            self.repo
                .set_expiry_hours(&key_value, hours.as_i64())
                .await?;
        }

        if let Some(paused) = body.get("is_paused").and_then(|v| v.as_bool()) {
            self.repo.set_paused(&key_value, paused).await?;
        }

        let key = self
            .repo
            .find_by_value(&key_value)
            .await?
            .ok_or_else(|| ApiError::NotFound("Key not found".to_string()))?;
        Ok(key)
    }

    pub async fn reset_hwid(&self, key_value: &str) -> Result<LicenseKey, ApiError> {
        let key_value = key_value.to_uppercase();
        let Some(_) = self.repo.find_by_value(&key_value).await? else {
            return Err(ApiError::NotFound("Key not found".to_string()));
        };

        if !self.repo.reset_hwid(&key_value).await? {
            return Err(ApiError::Forbidden("HWID reset limit reached".to_string()));
        }

        let key = self
            .repo
            .find_by_value(&key_value)
            .await?
            .ok_or_else(|| ApiError::NotFound("Key not found".to_string()))?;
        Ok(key)
    }

    pub async fn delete_key(&self, key_value: &str) -> Result<(), ApiError> {
        let key_value = key_value.to_uppercase();
        if !self.repo.delete(&key_value).await? {
            return Err(ApiError::NotFound("Key not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<u64, ApiError> {
        Ok(self.repo.delete_all().await?)
    }

    pub async fn find_key(&self, key_value: &str) -> Result<LicenseKey, ApiError> {
        self.repo
            .find_by_value(&key_value.to_uppercase())
            .await?
            .ok_or_else(|| ApiError::NotFound("Key not found".to_string()))
    }
}
