use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::public_dto::VerifyCertificationRequest;
use crate::middleware::auth::Claims;
use crate::services::certification_service::CertificationService;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_own(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let certs = CertificationService::new(state.pool.clone())
        .list_for_user(user_id)
        .await?;
    Ok(Json(certs).into_response())
}

/// Public credential lookup. Malformed ids get the French format sentinel
/// without a database read; unknown ids get `{valid: false}` at 200.
#[utoipa::path(
    post,
    path = "/api/public/certifications/verify",
    responses(
        (status = 200, description = "Verification result, valid or sentinel"),
        (status = 429, description = "Per-client rate limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn verify_certification(
    State(state): State<AppState>,
    Json(req): Json<VerifyCertificationRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let response = CertificationService::new(state.pool.clone())
        .verify(&req.credential_id)
        .await?;
    Ok(Json(response).into_response())
}

/// Open Badge 2.0 assertion for a known credential.
#[utoipa::path(
    get,
    path = "/api/public/certifications/{credential_id}/badge",
    responses(
        (status = 200, description = "Badge assertion JSON"),
        (status = 404, description = "Unknown credential")
    )
)]
#[axum::debug_handler]
pub async fn badge_assertion(
    State(state): State<AppState>,
    Path(credential_id): Path<String>,
) -> crate::error::Result<Response> {
    let assertion = CertificationService::new(state.pool.clone())
        .badge_assertion(&credential_id)
        .await?;
    Ok(Json(assertion).into_response())
}
