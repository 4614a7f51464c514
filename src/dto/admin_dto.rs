use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::planning::ObjectiveTarget;
use crate::models::question::QuestionType;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddLearnerRequest {
    #[validate(email)]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub school: Option<String>,
    pub class_name: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLearnerResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteUsersRequest {
    #[validate(length(min = 1, max = 500), nested)]
    pub users: Vec<AddLearnerRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteUserResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteUsersResponse {
    pub results: Vec<InviteUserResult>,
    pub invited: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdminInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub first_name: Option<String>,
    /// Must all belong to the closed capability set.
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEmailKind {
    Welcome,
    LoginReminder,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendAuthEmailRequest {
    #[validate(email)]
    pub email: String,
    pub kind: AuthEmailKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(range(min = 1))]
    pub level: i32,
    /// Appended after the level's last position when omitted.
    pub position: Option<i32>,
    #[validate(length(min = 1))]
    pub content: String,
    pub question_type: QuestionType,
    pub rule: Option<String>,
    pub choices: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    pub content: Option<String>,
    pub rule: Option<String>,
    pub choices: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertLevelPricingRequest {
    #[validate(range(min = 1))]
    pub level: i32,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub free_sessions: i32,
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
}

/// Partial update over the typed settings; absent fields keep their value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 1, max = 100))]
    pub questions_percentage: Option<i32>,
    pub anti_cheat_enabled: Option<bool>,
    #[validate(range(min = 1, max = 20))]
    pub anti_cheat_max_violations: Option<i32>,
    pub issuing_organization: Option<String>,
    pub footer_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateObjectiveRequest {
    pub school: Option<String>,
    pub class_name: Option<String>,
    pub city: Option<String>,
    pub target_type: ObjectiveTarget,
    pub target_level: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub target_percentage: Option<i32>,
    pub deadline: chrono::DateTime<chrono::Utc>,
}
