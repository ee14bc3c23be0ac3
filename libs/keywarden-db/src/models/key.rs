use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A license key bound to at most one hardware identifier.
///
/// Timestamps are UTC. The expiry clock starts at `first_use_at`, never at
/// `created_at`: a key that was never used cannot expire.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LicenseKey {
    pub id: i64,
    pub key_value: String,
    pub hwid: Option<String>,
    pub created_at: NaiveDateTime,
    pub first_use_at: Option<NaiveDateTime>,
    pub expires_in_days: Option<i64>,
    pub expires_in_hours: Option<i64>,
    pub is_active: bool,
    pub is_paused: bool,
    pub pause_count: i64,
    pub hwid_reset_count: i64,
}

impl LicenseKey {
    /// Absolute expiry instant, if the key has been used and has a positive
    /// expiry window configured. Stored zeros count as "no expiry", and so
    /// does a window too large to represent on the calendar.
    pub fn expiry_at(&self) -> Option<NaiveDateTime> {
        let first_use = self.first_use_at?;

        let window = if let Some(days) = self.expires_in_days.filter(|&d| d > 0) {
            Duration::try_days(days)
        } else if let Some(hours) = self.expires_in_hours.filter(|&h| h > 0) {
            Duration::try_hours(hours)
        } else {
            None
        }?;

        first_use.checked_add_signed(window)
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        match self.expiry_at() {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    /// Human-readable remaining validity, matching what clients display.
    pub fn remaining_time(&self, now: NaiveDateTime) -> String {
        if self.first_use_at.is_none() {
            if let Some(days) = self.expires_in_days.filter(|&d| d > 0) {
                return format!("{} days (not yet used)", days);
            } else if let Some(hours) = self.expires_in_hours.filter(|&h| h > 0) {
                return format!("{} hours (not yet used)", hours);
            }
            return "No expiration".to_string();
        }

        let Some(expiry) = self.expiry_at() else {
            return "No expiration".to_string();
        };

        let remaining = (expiry - now).num_seconds();
        if remaining <= 0 {
            return "Expired".to_string();
        }

        let days = remaining / 86_400;
        let hours = (remaining % 86_400) / 3_600;

        if days > 0 {
            format!("{} days and {} hours", days, hours)
        } else {
            format!("{} hours", hours)
        }
    }

    pub fn can_pause(&self) -> bool {
        self.pause_count < 3
    }

    pub fn can_reset_hwid(&self) -> bool {
        self.hwid_reset_count < 2
    }

    pub fn to_view(&self, now: NaiveDateTime) -> KeyView {
        KeyView {
            id: self.id,
            key: self.key_value.clone(),
            hwid: self.hwid.clone(),
            created_at: self.created_at,
            first_use_at: self.first_use_at,
            expires_in_days: self.expires_in_days,
            expires_in_hours: self.expires_in_hours,
            is_active: self.is_active,
            is_paused: self.is_paused,
            is_expired: self.is_expired(now),
            remaining_time: self.remaining_time(now),
            pause_count: self.pause_count,
            hwid_reset_count: self.hwid_reset_count,
            can_pause: self.can_pause(),
            can_reset_hwid: self.can_reset_hwid(),
        }
    }
}

/// Wire representation of a key, including the computed lifecycle fields.
#[derive(Debug, Clone, Serialize)]
pub struct KeyView {
    pub id: i64,
    pub key: String,
    pub hwid: Option<String>,
    pub created_at: NaiveDateTime,
    pub first_use_at: Option<NaiveDateTime>,
    pub expires_in_days: Option<i64>,
    pub expires_in_hours: Option<i64>,
    pub is_active: bool,
    pub is_paused: bool,
    pub is_expired: bool,
    pub remaining_time: String,
    pub pause_count: i64,
    pub hwid_reset_count: i64,
    pub can_pause: bool,
    pub can_reset_hwid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample_key() -> LicenseKey {
        LicenseKey {
            id: 1,
            key_value: "ABCD1234".to_string(),
            hwid: None,
            created_at: at(2020, 1, 1, 0),
            first_use_at: None,
            expires_in_days: None,
            expires_in_hours: None,
            is_active: true,
            is_paused: false,
            pause_count: 0,
            hwid_reset_count: 0,
        }
    }

    #[test]
    fn unused_key_never_expires() {
        let mut key = sample_key();
        key.expires_in_days = Some(1);

        // years past creation, still never used
        assert!(!key.is_expired(at(2030, 1, 1, 0)));
        assert_eq!(key.remaining_time(at(2030, 1, 1, 0)), "1 days (not yet used)");
    }

    #[test]
    fn no_expiry_configured_never_expires() {
        let mut key = sample_key();
        key.hwid = Some("hw".to_string());
        key.first_use_at = Some(at(2020, 1, 2, 0));

        assert!(!key.is_expired(at(2035, 1, 1, 0)));
        assert_eq!(key.remaining_time(at(2035, 1, 1, 0)), "No expiration");
    }

    #[test]
    fn zero_expiry_counts_as_no_expiry() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));
        key.expires_in_days = Some(0);

        assert!(key.expiry_at().is_none());
        assert!(!key.is_expired(at(2035, 1, 1, 0)));
    }

    #[test]
    fn absurdly_large_windows_never_expire() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));

        // beyond what Duration can even hold
        key.expires_in_days = Some(i64::MAX);
        assert!(key.expiry_at().is_none());
        assert!(!key.is_expired(at(2035, 1, 1, 0)));
        assert_eq!(key.remaining_time(at(2035, 1, 1, 0)), "No expiration");

        // representable as a Duration, but past the calendar's end
        key.expires_in_days = Some(100_000_000);
        assert!(key.expiry_at().is_none());
        assert!(!key.is_expired(at(2035, 1, 1, 0)));

        key.expires_in_days = None;
        key.expires_in_hours = Some(i64::MAX);
        assert!(key.expiry_at().is_none());
        assert!(!key.is_expired(at(2035, 1, 1, 0)));
    }

    #[test]
    fn days_window_expires_after_first_use() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));
        key.expires_in_days = Some(5);

        assert!(!key.is_expired(at(2020, 1, 7, 0)));
        assert!(key.is_expired(at(2020, 1, 7, 1)));
    }

    #[test]
    fn hours_window_expires_after_first_use() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));
        key.expires_in_hours = Some(2);

        assert!(!key.is_expired(at(2020, 1, 2, 2)));
        assert!(key.is_expired(at(2020, 1, 2, 3)));
        assert_eq!(key.remaining_time(at(2020, 1, 2, 3)), "Expired");
    }

    #[test]
    fn remaining_time_splits_days_and_hours() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));
        key.expires_in_days = Some(3);

        assert_eq!(key.remaining_time(at(2020, 1, 2, 5)), "2 days and 19 hours");

        key.expires_in_days = None;
        key.expires_in_hours = Some(10);
        assert_eq!(key.remaining_time(at(2020, 1, 2, 4)), "6 hours");
    }

    #[test]
    fn eligibility_caps() {
        let mut key = sample_key();
        assert!(key.can_pause());
        assert!(key.can_reset_hwid());

        key.pause_count = 3;
        key.hwid_reset_count = 2;
        assert!(!key.can_pause());
        assert!(!key.can_reset_hwid());
    }

    #[test]
    fn view_carries_computed_fields() {
        let mut key = sample_key();
        key.first_use_at = Some(at(2020, 1, 2, 0));
        key.hwid = Some("hw".to_string());
        key.expires_in_hours = Some(1);

        let view = key.to_view(at(2020, 1, 2, 2));
        assert_eq!(view.key, "ABCD1234");
        assert!(view.is_expired);
        assert_eq!(view.remaining_time, "Expired");
        assert!(view.can_pause);
        assert!(view.can_reset_hwid);
    }
}
