use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{Question, QuestionType};
use crate::models::test_session::{SessionStatus, SessionType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionQuestionsRequest {
    #[validate(range(min = 1))]
    pub level: i32,
    #[validate(range(min = 1))]
    pub session_number: i32,
    pub session_type: SessionType,
    #[validate(range(min = 1, max = 100))]
    pub questions_percentage: Option<i32>,
}

/// Learner-facing question. The stored answer (and the explanation/rule
/// that the validator reveals after a wrong answer) never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub level: i32,
    pub position: i32,
    pub content: String,
    pub question_type: QuestionType,
    pub choices: Option<Vec<String>>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            level: q.level,
            position: q.position,
            content: q.content,
            question_type: q.question_type,
            choices: q.choices.map(|c| c.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ValidateAnswerRequest {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub user_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateAnswerResponse {
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(range(min = 1))]
    pub level: i32,
    #[validate(range(min = 1))]
    pub session_number: i32,
    pub session_type: SessionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub level: i32,
    pub session_number: i32,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    #[validate(length(max = 500))]
    pub user_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitSessionRequest {
    #[validate(length(min = 1), nested)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSessionResponse {
    pub session_id: Uuid,
    pub score: Decimal,
    pub passed: bool,
    pub correct_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ViolationRequest {
    /// tab_switch, window_blur or close_attempt.
    #[validate(length(min = 1, max = 50))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationResponse {
    pub violation_count: i32,
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Locked,
    Available,
    Current,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgressEntry {
    pub session_number: i32,
    /// Display label; remedial slots render as "99.R".
    pub label: String,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelProgressResponse {
    pub level: i32,
    pub level_name: String,
    pub total_sessions: i32,
    pub completed_sessions: i32,
    pub remedial_required: bool,
    pub validated: bool,
    pub sessions: Vec<SessionProgressEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn learner_payload_never_carries_the_answer() {
        let question = Question {
            id: Uuid::new_v4(),
            level: 2,
            position: 7,
            content: "Accordez le participe passé".to_string(),
            question_type: QuestionType::MultipleChoice,
            rule: Some("Accord avec avoir".to_string()),
            choices: Some(sqlx::types::Json(vec![
                "chanté".to_string(),
                "chantée".to_string(),
            ])),
            answer: "chantée".to_string(),
            explanation: Some("Le COD précède le verbe".to_string()),
            created_at: Utc::now(),
        };

        let payload = serde_json::to_value(PublicQuestion::from(question)).unwrap();
        let object = payload.as_object().unwrap();
        assert!(!object.contains_key("answer"));
        assert!(!object.contains_key("explanation"));
        assert!(!object.contains_key("rule"));
        assert_eq!(object["choices"][1], "chantée");
        assert_eq!(object["question_type"], "multiple_choice");
    }
}
