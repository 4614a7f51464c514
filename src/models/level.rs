use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Pricing and quota configuration for one difficulty tier.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LevelPricing {
    pub level: i32,
    pub name: String,
    pub price: Decimal,
    /// Sessions a learner may take at this level before a purchase is required.
    pub free_sessions: i32,
    pub currency: String,
}
