use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::admin_dto::{
    AddLearnerRequest, AdminInvitationRequest, AuthEmailKind, CreateObjectiveRequest,
    CreateQuestionRequest, DeleteUserResponse, InviteUsersRequest, ResetPasswordRequest,
    ResetPasswordResponse, SendAuthEmailRequest, UpdateQuestionRequest, UpdateSettingsRequest,
    UpsertLevelPricingRequest,
};
use crate::error::{Error, Result};
use crate::events::TOPIC_CAPABILITIES;
use crate::middleware::auth::Claims;
use crate::models::level::LevelPricing;
use crate::models::user::{AdminCapability, User};
use crate::services::admin_service::AdminService;
use crate::services::audit_service::AuditService;
use crate::services::planning_service::PlanningService;
use crate::services::question_service::QuestionService;
use crate::services::settings_service::SettingsService;
use crate::AppState;

/// All capability decisions go through the actor row, not the token, so a
/// revoked flag takes effect immediately.
async fn load_actor(state: &AppState, claims: &Claims) -> Result<User> {
    let user_id = claims.user_id()?;
    sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1 AND is_active = TRUE"#)
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("unknown_user".to_string()))
}

fn require_capability(actor: &User, cap: AdminCapability) -> Result<()> {
    if actor.has_capability(cap) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "missing capability {}",
            cap.as_str()
        )))
    }
}

#[axum::debug_handler]
pub async fn add_learner(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddLearnerRequest>,
) -> Result<Response> {
    req.validate()?;
    let created = AdminService::new(state.pool.clone()).create_learner(req).await?;

    AuditService::new(state.pool.clone())
        .log(
            claims.user_id().ok(),
            "learner_created",
            "user",
            created.user_id,
            Some(json!({ "email": created.email })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[axum::debug_handler]
pub async fn invite_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteUsersRequest>,
) -> Result<Response> {
    req.validate()?;
    let summary = AdminService::new(state.pool.clone()).invite_users(req.users).await;

    AuditService::new(state.pool.clone())
        .log(
            claims.user_id().ok(),
            "learners_invited",
            "user",
            claims.user_id()?,
            Some(json!({ "invited": summary.invited, "failed": summary.failed })),
        )
        .await?;

    Ok(Json(summary).into_response())
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<Response> {
    AdminService::new(state.pool.clone()).delete_user(user_id).await?;

    AuditService::new(state.pool.clone())
        .log(claims.user_id().ok(), "user_deleted", "user", user_id, None)
        .await?;

    Ok(Json(DeleteUserResponse { success: true }).into_response())
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Response> {
    req.validate()?;
    let message = AdminService::new(state.pool.clone())
        .reset_password(&req.email)
        .await?;

    AuditService::new(state.pool.clone())
        .log(
            claims.user_id().ok(),
            "password_reset",
            "user",
            claims.user_id()?,
            Some(json!({ "email": req.email })),
        )
        .await?;

    Ok(Json(ResetPasswordResponse {
        success: true,
        message,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn invite_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdminInvitationRequest>,
) -> Result<Response> {
    req.validate()?;
    let capabilities = req.capabilities.clone();
    let created = AdminService::new(state.pool.clone()).invite_admin(req).await?;

    state.hub.publish(
        TOPIC_CAPABILITIES,
        json!({ "user_id": created.user_id, "capabilities": capabilities }),
    );
    AuditService::new(state.pool.clone())
        .log(
            claims.user_id().ok(),
            "admin_invited",
            "user",
            created.user_id,
            Some(json!({ "capabilities": capabilities })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Re-sends an account email to an existing user. The send goes through the
/// outbox like every other transactional email.
#[axum::debug_handler]
pub async fn send_auth_email(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendAuthEmailRequest>,
) -> Result<Response> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();
    let user = sqlx::query_as::<_, User>(
        r#"SELECT * FROM users WHERE email = $1 AND is_active = TRUE"#,
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| Error::NotFound("Unknown user".to_string()))?;

    let config = crate::config::get_config();
    let (subject, body) = match req.kind {
        AuthEmailKind::Welcome => {
            crate::services::email_service::templates::welcome(
                user.first_name.as_deref(),
                &user.email,
                None,
            )
        }
        AuthEmailKind::LoginReminder => {
            crate::services::email_service::templates::login_reminder(&user.email, &config.app_url)
        }
    };
    crate::services::email_service::EmailService::new(state.pool.clone())
        .enqueue(&user.email, &subject, &body)
        .await?;

    AuditService::new(state.pool.clone())
        .log(
            claims.user_id().ok(),
            "auth_email_sent",
            "user",
            user.id,
            Some(json!({ "kind": req.kind })),
        )
        .await?;

    Ok(Json(json!({ "success": true, "message": "Email envoyé" })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    pub level: i32,
}

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<QuestionListQuery>,
) -> Result<Response> {
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageQuestions)?;
    let questions = QuestionService::new(state.pool.clone())
        .list_for_level(query.level)
        .await?;
    Ok(Json(questions).into_response())
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<Response> {
    req.validate()?;
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageQuestions)?;

    let question = QuestionService::new(state.pool.clone()).create(req).await?;
    AuditService::new(state.pool.clone())
        .log(
            Some(actor.id),
            "question_created",
            "question",
            question.id,
            Some(json!({ "level": question.level, "position": question.position })),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(question)).into_response())
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuestionRequest>,
) -> Result<Response> {
    req.validate()?;
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageQuestions)?;

    let question = QuestionService::new(state.pool.clone()).update(id, req).await?;
    AuditService::new(state.pool.clone())
        .log(Some(actor.id), "question_updated", "question", id, None)
        .await?;
    Ok(Json(question).into_response())
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageQuestions)?;

    QuestionService::new(state.pool.clone()).delete(id).await?;
    AuditService::new(state.pool.clone())
        .log(Some(actor.id), "question_deleted", "question", id, None)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn upsert_level_pricing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertLevelPricingRequest>,
) -> Result<Response> {
    req.validate()?;
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManagePricing)?;

    let pricing = sqlx::query_as::<_, LevelPricing>(
        r#"
        INSERT INTO level_pricing (level, name, price, free_sessions, currency)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (level) DO UPDATE SET
            name = EXCLUDED.name,
            price = EXCLUDED.price,
            free_sessions = EXCLUDED.free_sessions,
            currency = EXCLUDED.currency
        RETURNING *
        "#,
    )
    .bind(req.level)
    .bind(&req.name)
    .bind(req.price)
    .bind(req.free_sessions)
    .bind(&req.currency)
    .fetch_one(&state.pool)
    .await?;

    AuditService::new(state.pool.clone())
        .log(
            Some(actor.id),
            "level_pricing_updated",
            "level_pricing",
            actor.id,
            Some(json!({ "level": req.level, "price": req.price.to_string() })),
        )
        .await?;
    Ok(Json(pricing).into_response())
}

#[axum::debug_handler]
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageSettings)?;
    let settings = SettingsService::new(state.pool.clone()).load().await?;
    Ok(Json(settings).into_response())
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Response> {
    req.validate()?;
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManageSettings)?;

    let settings = SettingsService::new(state.pool.clone())
        .update(req, &state.hub)
        .await?;
    AuditService::new(state.pool.clone())
        .log(Some(actor.id), "settings_updated", "site_settings", actor.id, None)
        .await?;
    Ok(Json(settings).into_response())
}

#[axum::debug_handler]
pub async fn create_objective(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateObjectiveRequest>,
) -> Result<Response> {
    req.validate()?;
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManagePlanning)?;

    let objective = PlanningService::new(state.pool.clone()).create(req).await?;
    AuditService::new(state.pool.clone())
        .log(
            Some(actor.id),
            "objective_created",
            "planning_objective",
            objective.id,
            None,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(objective)).into_response())
}

#[axum::debug_handler]
pub async fn delete_objective(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let actor = load_actor(&state, &claims).await?;
    require_capability(&actor, AdminCapability::ManagePlanning)?;

    PlanningService::new(state.pool.clone()).delete(id).await?;
    AuditService::new(state.pool.clone())
        .log(Some(actor.id), "objective_deleted", "planning_objective", id, None)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
