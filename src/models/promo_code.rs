use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub code: String,
    /// None makes the code valid for any level.
    pub level: Option<i32>,
    pub max_uses: i32,
    pub use_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromoCode {
    pub fn is_usable_for(&self, level: i32, now: DateTime<Utc>) -> bool {
        if self.use_count >= self.max_uses {
            return false;
        }
        if let Some(expiry) = self.expires_at {
            if expiry <= now {
                return false;
            }
        }
        self.level.map_or(true, |l| l == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(level: Option<i32>, max_uses: i32, use_count: i32, expires_in: Option<i64>) -> PromoCode {
        PromoCode {
            code: "RENTREE2026".into(),
            level,
            max_uses,
            use_count,
            expires_at: expires_in.map(|h| Utc::now() + Duration::hours(h)),
        }
    }

    #[test]
    fn exhausted_code_is_rejected() {
        assert!(!code(None, 5, 5, None).is_usable_for(2, Utc::now()));
    }

    #[test]
    fn expired_code_is_rejected() {
        assert!(!code(None, 5, 0, Some(-1)).is_usable_for(2, Utc::now()));
    }

    #[test]
    fn level_scoped_code_only_matches_its_level() {
        let c = code(Some(3), 5, 0, Some(24));
        assert!(c.is_usable_for(3, Utc::now()));
        assert!(!c.is_usable_for(2, Utc::now()));
    }

    #[test]
    fn unscoped_code_matches_any_level() {
        assert!(code(None, 1, 0, None).is_usable_for(4, Utc::now()));
    }
}
