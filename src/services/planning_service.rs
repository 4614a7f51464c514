use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::CreateObjectiveRequest;
use crate::error::{Error, Result};
use crate::models::planning::PlanningObjective;
use crate::models::user::User;
use crate::utils::time::days_until;

#[derive(Clone)]
pub struct PlanningService {
    pool: PgPool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ObjectiveCountdown {
    #[serde(flatten)]
    pub objective: PlanningObjective,
    pub days_remaining: i64,
}

impl PlanningService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Objectives whose scope matches the learner; NULL scope columns match
    /// everyone. Soonest deadline first.
    pub async fn for_learner(&self, user: &User) -> Result<Vec<ObjectiveCountdown>> {
        let objectives = sqlx::query_as::<_, PlanningObjective>(
            r#"
            SELECT * FROM planning_objectives
            WHERE (school IS NULL OR school = $1)
              AND (class_name IS NULL OR class_name = $2)
              AND (city IS NULL OR city = $3)
            ORDER BY deadline ASC
            "#,
        )
        .bind(&user.school)
        .bind(&user.class_name)
        .bind(&user.city)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(objectives
            .into_iter()
            .map(|objective| ObjectiveCountdown {
                days_remaining: days_until(objective.deadline, now),
                objective,
            })
            .collect())
    }

    pub async fn create(&self, req: CreateObjectiveRequest) -> Result<PlanningObjective> {
        let objective = sqlx::query_as::<_, PlanningObjective>(
            r#"
            INSERT INTO planning_objectives
                (school, class_name, city, target_type, target_level, target_percentage, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(req.school)
        .bind(req.class_name)
        .bind(req.city)
        .bind(req.target_type)
        .bind(req.target_level)
        .bind(req.target_percentage)
        .bind(req.deadline)
        .fetch_one(&self.pool)
        .await?;
        Ok(objective)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM planning_objectives WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Objective not found".to_string()));
        }
        Ok(())
    }
}
