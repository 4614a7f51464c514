use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCertification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i32,
    pub score: Decimal,
    pub certified_at: DateTime<Utc>,
    pub credential_id: String,
    pub issuing_organization: String,
    /// None means the certification never expires.
    pub expiration_date: Option<DateTime<Utc>>,
}
