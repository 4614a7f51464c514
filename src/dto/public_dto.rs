use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyCertificationRequest {
    #[validate(length(min = 1, max = 64))]
    pub credential_id: String,
}

/// Public verification result. Misses keep the 200 `{valid: false}`
/// sentinel contract; hits carry the certification fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCertificationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyCertificationResponse {
    pub fn invalid(error: Option<String>) -> Self {
        Self {
            valid: false,
            credential_id: None,
            level: None,
            level_name: None,
            score: None,
            certified_at: None,
            issuing_organization: None,
            expiration_date: None,
            error,
        }
    }
}

/// Open Badge 2.0-shaped assertion rendered from stored certification
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAssertion {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "type")]
    pub assertion_type: String,
    pub id: String,
    pub recipient: BadgeRecipient,
    pub badge: BadgeClass,
    #[serde(rename = "issuedOn")]
    pub issued_on: DateTime<Utc>,
    #[serde(rename = "expires", skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    pub verification: BadgeVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRecipient {
    #[serde(rename = "type")]
    pub recipient_type: String,
    pub hashed: bool,
    pub identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeClass {
    #[serde(rename = "type")]
    pub badge_type: String,
    pub name: String,
    pub description: String,
    pub issuer: BadgeIssuer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeIssuer {
    #[serde(rename = "type")]
    pub issuer_type: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeVerification {
    #[serde(rename = "type")]
    pub verification_type: String,
}
