use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "purchase_status", rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
}

/// Level access bought through the payment gateway (or granted by a promo
/// code). `payment_reference` holds the gateway checkout-session id and is
/// unique, which makes completion idempotent across the webhook, the client
/// verify call and the reconciliation worker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserLevelPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i32,
    pub price_paid: Decimal,
    pub payment_reference: String,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
