use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::{
    config::get_config,
    error::{Error, Result},
    utils::signature::verify_webhook_signature,
    AppState,
};

/// Gateway notification endpoint. The signature covers the raw body, so the
/// payload is only parsed after verification succeeds.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let Some(signature_hdr) = headers.get("gateway-signature") else {
        return Err(Error::Unauthorized("missing_signature".into()));
    };
    let signature = signature_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_signature_header".into()))?;

    let secret = &get_config().payment_webhook_secret;
    if verify_webhook_signature(signature, &body, secret, Utc::now().timestamp()).is_none() {
        return Err(Error::Unauthorized("invalid_signature".into()));
    }

    let event: crate::dto::payment_dto::GatewayEvent = serde_json::from_slice(&body)?;
    let completed_level = crate::services::payment_service::PaymentService::new(state.pool.clone())
        .handle_gateway_event(&event)
        .await?;

    if let Some(level) = completed_level {
        tracing::info!(level, event_type = %event.event_type, "purchase reconciled from webhook");
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "received": true })),
    ))
}
