use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (user, question) that was ever answered incorrectly. The
/// remedial session draws from rows where `is_remediated` is still false.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FailedQuestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i32,
    pub question_id: Uuid,
    pub is_remediated: bool,
    pub created_at: DateTime<Utc>,
}
