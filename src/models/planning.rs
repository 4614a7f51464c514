use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "objective_target", rename_all = "snake_case")]
pub enum ObjectiveTarget {
    Certification,
    Progression,
}

/// School/class/city scoped deadline, read-only input to learner countdown
/// displays. Never mutated by learner actions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanningObjective {
    pub id: Uuid,
    pub school: Option<String>,
    pub class_name: Option<String>,
    pub city: Option<String>,
    pub target_type: ObjectiveTarget,
    pub target_level: Option<i32>,
    pub target_percentage: Option<i32>,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
