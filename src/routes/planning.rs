use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::error::Error;
use crate::middleware::auth::Claims;
use crate::models::user::User;
use crate::services::planning_service::PlanningService;
use crate::AppState;

#[axum::debug_handler]
pub async fn my_objectives(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let user = sqlx::query_as::<_, User>(
        r#"SELECT * FROM users WHERE id = $1 AND is_active = TRUE"#,
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| Error::Unauthorized("unknown_user".to_string()))?;

    let objectives = PlanningService::new(state.pool.clone())
        .for_learner(&user)
        .await?;
    Ok(Json(objectives).into_response())
}
