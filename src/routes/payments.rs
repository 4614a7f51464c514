use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::dto::payment_dto::{
    CreatePaymentRequest, CreatePaymentResponse, PromoRequest, PromoResponse,
    VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::middleware::auth::Claims;
use crate::services::audit_service::AuditService;
use crate::services::payment_service::PaymentService;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePaymentRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let url = PaymentService::new(state.pool.clone())
        .create_payment(user_id, req.level)
        .await?;

    AuditService::new(state.pool.clone())
        .log(
            Some(user_id),
            "payment_initiated",
            "user_level_purchase",
            user_id,
            Some(json!({ "level": req.level })),
        )
        .await?;

    Ok(Json(CreatePaymentResponse { url }).into_response())
}

#[axum::debug_handler]
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyPaymentRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let level = PaymentService::new(state.pool.clone())
        .verify_payment(user_id, &req.session_id)
        .await?;

    if let Some(level) = level {
        AuditService::new(state.pool.clone())
            .log(
                Some(user_id),
                "payment_verified",
                "user_level_purchase",
                user_id,
                Some(json!({ "level": level, "session_id": req.session_id })),
            )
            .await?;
    }

    Ok(Json(VerifyPaymentResponse {
        success: level.is_some(),
        level,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn redeem_promo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PromoRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    PaymentService::new(state.pool.clone())
        .redeem_promo(user_id, &req.code, req.level)
        .await?;

    AuditService::new(state.pool.clone())
        .log(
            Some(user_id),
            "promo_redeemed",
            "user_level_purchase",
            user_id,
            Some(json!({ "level": req.level })),
        )
        .await?;

    Ok(Json(PromoResponse {
        success: true,
        level: req.level,
    })
    .into_response())
}
