use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(range(min = 2))]
    pub level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 255))]
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PromoRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(range(min = 2))]
    pub level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoResponse {
    pub success: bool,
    pub level: i32,
}

/// Gateway webhook envelope, Stripe-shaped: `{"type": "...", "data":
/// {"object": {...}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_status: Option<String>,
    pub client_reference_id: Option<String>,
    pub amount_total: Option<i64>,
}
