use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Learner,
    Admin,
    SuperAdmin,
}

/// Closed set of admin feature flags. Stored as text[] on the user row;
/// unknown strings are ignored on read so old rows never break decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminCapability {
    ManageQuestions,
    ManagePricing,
    ManageSettings,
    ManagePlanning,
    InviteLearners,
}

impl AdminCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCapability::ManageQuestions => "manage_questions",
            AdminCapability::ManagePricing => "manage_pricing",
            AdminCapability::ManageSettings => "manage_settings",
            AdminCapability::ManagePlanning => "manage_planning",
            AdminCapability::InviteLearners => "invite_learners",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manage_questions" => Some(AdminCapability::ManageQuestions),
            "manage_pricing" => Some(AdminCapability::ManagePricing),
            "manage_settings" => Some(AdminCapability::ManageSettings),
            "manage_planning" => Some(AdminCapability::ManagePlanning),
            "invite_learners" => Some(AdminCapability::InviteLearners),
            _ => None,
        }
    }

    pub fn all() -> &'static [AdminCapability] {
        &[
            AdminCapability::ManageQuestions,
            AdminCapability::ManagePricing,
            AdminCapability::ManageSettings,
            AdminCapability::ManagePlanning,
            AdminCapability::InviteLearners,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub school: Option<String>,
    pub class_name: Option<String>,
    pub city: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub capabilities: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_capability(&self, cap: AdminCapability) -> bool {
        self.role == UserRole::SuperAdmin
            || self
                .capabilities
                .iter()
                .filter_map(|s| AdminCapability::parse(s))
                .any(|c| c == cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_round_trip() {
        for cap in AdminCapability::all() {
            assert_eq!(AdminCapability::parse(cap.as_str()), Some(*cap));
        }
        assert_eq!(AdminCapability::parse("export_everything"), None);
    }
}
