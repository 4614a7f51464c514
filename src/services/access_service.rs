use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::level::LevelPricing;
use crate::models::purchase::PurchaseStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    RequiresPurchase,
    PriorLevelNotValidated,
}

/// Pure gate rule. Level 1 is always free; higher levels need the previous
/// level validated, then either remaining free quota or a completed
/// purchase.
pub fn evaluate_access(
    level: i32,
    prior_level_validated: bool,
    sessions_taken: i64,
    free_sessions: i32,
    has_completed_purchase: bool,
) -> AccessDecision {
    if level <= 1 {
        return AccessDecision::Granted;
    }
    if !prior_level_validated {
        return AccessDecision::PriorLevelNotValidated;
    }
    if has_completed_purchase || sessions_taken < free_sessions as i64 {
        AccessDecision::Granted
    } else {
        AccessDecision::RequiresPurchase
    }
}

#[derive(Clone)]
pub struct AccessService {
    pool: PgPool,
}

impl AccessService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn level_pricing(&self, level: i32) -> Result<LevelPricing> {
        let pricing =
            sqlx::query_as::<_, LevelPricing>(r#"SELECT * FROM level_pricing WHERE level = $1"#)
                .bind(level)
                .fetch_optional(&self.pool)
                .await?;
        pricing.ok_or_else(|| Error::NotFound("Unknown level".to_string()))
    }

    pub async fn has_completed_purchase(&self, user_id: Uuid, level: i32) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_level_purchases
                WHERE user_id = $1 AND level = $2 AND status = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(PurchaseStatus::Completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Certifications are issued exactly when a level flips to validated, so
    /// their existence is the validation marker.
    pub async fn is_level_validated(&self, user_id: Uuid, level: i32) -> Result<bool> {
        if level <= 0 {
            return Ok(true);
        }
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_certifications WHERE user_id = $1 AND level = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn sessions_taken(&self, user_id: Uuid, level: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_sessions
            WHERE user_id = $1 AND level = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn check_session_access(&self, user_id: Uuid, level: i32) -> Result<()> {
        if level <= 1 {
            return Ok(());
        }
        let prior_validated = self.is_level_validated(user_id, level - 1).await?;
        let pricing = self.level_pricing(level).await?;
        let taken = self.sessions_taken(user_id, level).await?;
        let purchased = self.has_completed_purchase(user_id, level).await?;

        match evaluate_access(level, prior_validated, taken, pricing.free_sessions, purchased) {
            AccessDecision::Granted => Ok(()),
            AccessDecision::PriorLevelNotValidated => Err(Error::Forbidden(
                "Previous level must be validated first".to_string(),
            )),
            AccessDecision::RequiresPurchase => Err(Error::Forbidden(
                "Free session quota exhausted; purchase required".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_is_always_accessible() {
        assert_eq!(
            evaluate_access(1, false, 1000, 0, false),
            AccessDecision::Granted
        );
    }

    #[test]
    fn higher_level_needs_prior_validation() {
        assert_eq!(
            evaluate_access(2, false, 0, 5, true),
            AccessDecision::PriorLevelNotValidated
        );
    }

    #[test]
    fn free_quota_is_consumed_exactly_at_the_limit() {
        assert_eq!(evaluate_access(2, true, 0, 1, false), AccessDecision::Granted);
        assert_eq!(
            evaluate_access(2, true, 1, 1, false),
            AccessDecision::RequiresPurchase
        );
    }

    #[test]
    fn completed_purchase_unlocks_past_the_quota() {
        assert_eq!(evaluate_access(2, true, 10, 1, true), AccessDecision::Granted);
    }

    #[test]
    fn zero_quota_without_purchase_requires_payment() {
        assert_eq!(
            evaluate_access(3, true, 0, 0, false),
            AccessDecision::RequiresPurchase
        );
    }
}
