use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FreeText,
}

/// Full question row, including the stored answer. Never serialized to
/// learners directly; see `dto::session_dto::PublicQuestion`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub level: i32,
    pub position: i32,
    pub content: String,
    pub question_type: QuestionType,
    pub rule: Option<String>,
    pub choices: Option<sqlx::types::Json<Vec<String>>>,
    pub answer: String,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}
