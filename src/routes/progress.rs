use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::middleware::auth::Claims;
use crate::services::progress_service::ProgressService;
use crate::services::settings_service::SettingsService;
use crate::AppState;

#[axum::debug_handler]
pub async fn level_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(level): Path<i32>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    let progress = ProgressService::new(state.pool.clone())
        .level_progress(user_id, level, &settings)
        .await?;
    Ok(Json(progress).into_response())
}
