use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use sqlx::SqlitePool;

use crate::models::key::LicenseKey;

const KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const KEY_LEN: usize = 8;

const KEY_COLUMNS: &str = "id, key_value, hwid, created_at, first_use_at, \
     expires_in_days, expires_in_hours, is_active, is_paused, pause_count, hwid_reset_count";

/// Generate a candidate 8-character uppercase alphanumeric key value.
pub fn generate_key_value() -> String {
    let mut rng = rand::rng();
    (0..KEY_LEN)
        .map(|_| KEY_CHARSET[rng.random_range(0..KEY_CHARSET.len())] as char)
        .collect()
}

#[derive(Clone, Debug)]
pub struct KeyRepository {
    pool: SqlitePool,
}

impl KeyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create `quantity` keys in one transaction, rejection-sampling each
    /// value against the table (including rows inserted earlier in the same
    /// batch) so no two keys ever share a value. At most one expiry window is
    /// ever stored; when both are given, hours wins, same as updates.
    pub async fn create_batch(
        &self,
        quantity: u32,
        expires_in_days: Option<i64>,
        expires_in_hours: Option<i64>,
    ) -> Result<Vec<String>> {
        let expires_in_days = if expires_in_hours.is_some() {
            None
        } else {
            expires_in_days
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin key creation transaction")?;

        let now = Utc::now().naive_utc();
        let mut values = Vec::with_capacity(quantity as usize);

        for _ in 0..quantity {
            let value = loop {
                let candidate = generate_key_value();
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM license_keys WHERE key_value = ?)",
                )
                .bind(&candidate)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to check key value uniqueness")?;

                if !exists {
                    break candidate;
                }
            };

            sqlx::query(
                "INSERT INTO license_keys (key_value, created_at, expires_in_days, expires_in_hours) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&value)
            .bind(now)
            .bind(expires_in_days)
            .bind(expires_in_hours)
            .execute(&mut *tx)
            .await
            .context("Failed to insert license key")?;

            values.push(value);
        }

        tx.commit()
            .await
            .context("Failed to commit key creation transaction")?;

        Ok(values)
    }

    /// Exact-match lookup; callers normalize the value to uppercase first.
    pub async fn find_by_value(&self, key_value: &str) -> Result<Option<LicenseKey>> {
        let key = sqlx::query_as::<_, LicenseKey>(&format!(
            "SELECT {} FROM license_keys WHERE key_value = ?",
            KEY_COLUMNS
        ))
        .bind(key_value)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch license key")?;

        Ok(key)
    }

    pub async fn list_all(&self) -> Result<Vec<LicenseKey>> {
        let keys = sqlx::query_as::<_, LicenseKey>(&format!(
            "SELECT {} FROM license_keys ORDER BY created_at DESC, id DESC",
            KEY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch license keys")?;

        Ok(keys)
    }

    pub async fn count_total(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM license_keys")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count license keys")?;
        Ok(count)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM license_keys WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count active license keys")?;
        Ok(count)
    }

    pub async fn count_used(&self) -> Result<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM license_keys WHERE hwid IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .context("Failed to count used license keys")?;
        Ok(count)
    }

    /// First-use binding. The `hwid IS NULL` guard makes the check-then-set
    /// atomic: exactly one concurrent caller observes `true`.
    pub async fn bind_hwid(
        &self,
        key_value: &str,
        hwid: &str,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE license_keys SET hwid = ?, first_use_at = ? \
             WHERE key_value = ? AND hwid IS NULL",
        )
        .bind(hwid)
        .bind(now)
        .bind(key_value)
        .execute(&self.pool)
        .await
        .context("Failed to bind HWID")?;

        Ok(result.rows_affected() == 1)
    }

    /// Setting one expiry window clears the other.
    pub async fn set_expiry_days(&self, key_value: &str, days: Option<i64>) -> Result<()> {
        sqlx::query(
            "UPDATE license_keys SET expires_in_days = ?, expires_in_hours = NULL \
             WHERE key_value = ?",
        )
        .bind(days)
        .bind(key_value)
        .execute(&self.pool)
        .await
        .context("Failed to update expiry days")?;

        Ok(())
    }

    pub async fn set_expiry_hours(&self, key_value: &str, hours: Option<i64>) -> Result<()> {
        sqlx::query(
            "UPDATE license_keys SET expires_in_hours = ?, expires_in_days = NULL \
             WHERE key_value = ?",
        )
        .bind(hours)
        .bind(key_value)
        .execute(&self.pool)
        .await
        .context("Failed to update expiry hours")?;

        Ok(())
    }

    /// Pausing is a no-op once the pause cap is reached; the guard keeps the
    /// counter at or below 3 even under concurrent requests. Resuming is
    /// always allowed.
    pub async fn set_paused(&self, key_value: &str, paused: bool) -> Result<()> {
        if paused {
            sqlx::query(
                "UPDATE license_keys SET is_paused = 1, pause_count = pause_count + 1 \
                 WHERE key_value = ? AND pause_count < 3",
            )
            .bind(key_value)
            .execute(&self.pool)
            .await
            .context("Failed to pause license key")?;
        } else {
            sqlx::query("UPDATE license_keys SET is_paused = 0 WHERE key_value = ?")
                .bind(key_value)
                .execute(&self.pool)
                .await
                .context("Failed to resume license key")?;
        }

        Ok(())
    }

    /// Clears the binding and bumps the reset counter; returns false once the
    /// reset cap is reached.
    pub async fn reset_hwid(&self, key_value: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE license_keys SET hwid = NULL, first_use_at = NULL, \
             hwid_reset_count = hwid_reset_count + 1 \
             WHERE key_value = ? AND hwid_reset_count < 2",
        )
        .bind(key_value)
        .execute(&self.pool)
        .await
        .context("Failed to reset HWID")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, key_value: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM license_keys WHERE key_value = ?")
            .bind(key_value)
            .execute(&self.pool)
            .await
            .context("Failed to delete license key")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM license_keys")
            .execute(&self.pool)
            .await
            .context("Failed to delete license keys")?;

        Ok(result.rows_affected())
    }
}
