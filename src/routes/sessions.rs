use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{
    PublicQuestion, SessionQuestionsRequest, StartSessionRequest, StartSessionResponse,
    SubmitSessionRequest, ValidateAnswerRequest, ViolationRequest,
};
use crate::middleware::auth::Claims;
use crate::services::question_service::QuestionService;
use crate::services::session_service::SessionService;
use crate::services::settings_service::SettingsService;
use crate::AppState;

/// Questions for one session slot. The stored answers never leave the
/// server; remedial requests may legitimately return an empty list.
#[axum::debug_handler]
pub async fn get_session_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SessionQuestionsRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    let questions = QuestionService::new(state.pool.clone())
        .session_questions(user_id, &req, settings.questions_percentage)
        .await?;
    let payload: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();
    Ok(Json(payload).into_response())
}

#[axum::debug_handler]
pub async fn validate_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ValidateAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let response = SessionService::new(state.pool.clone())
        .validate_answer(user_id, &req)
        .await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartSessionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    let session = SessionService::new(state.pool.clone())
        .start(user_id, &req, &settings)
        .await?;
    Ok(Json(StartSessionResponse {
        session_id: session.id,
        level: session.level,
        session_number: session.session_number,
        session_type: session.session_type,
        status: session.status,
        started_at: session.started_at,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitSessionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    let response = SessionService::new(state.pool.clone())
        .submit(session_id, user_id, &req, &settings)
        .await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn report_violation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ViolationRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    let response = SessionService::new(state.pool.clone())
        .report_violation(session_id, user_id, &req.reason, &settings)
        .await?;
    Ok(Json(response).into_response())
}
