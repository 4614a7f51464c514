use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Session numbers at or above this are remedial (rattrapage) slots.
pub const REMEDIAL_SESSION_BASE: i32 = 99;

/// Minimum score (percent) for a session of any type to count as passed.
pub const PASS_THRESHOLD: i64 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_type", rename_all = "snake_case")]
pub enum SessionType {
    Regular,
    Remedial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i32,
    pub session_number: i32,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub score: Option<Decimal>,
    pub question_count: i32,
    pub violation_count: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSession {
    pub fn passed(&self) -> bool {
        matches!(self.status, SessionStatus::Completed)
            && self.score.map_or(false, |s| s >= Decimal::from(PASS_THRESHOLD))
    }
}
