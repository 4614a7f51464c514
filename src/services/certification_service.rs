use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::public_dto::{
    BadgeAssertion, BadgeClass, BadgeIssuer, BadgeRecipient, BadgeVerification,
    VerifyCertificationResponse,
};
use crate::error::{Error, Result};
use crate::models::certification::UserCertification;
use crate::utils::token::{generate_credential_id, is_valid_credential_id};

pub const INVALID_FORMAT_MESSAGE: &str = "Format d'identifiant invalide";

#[derive(Clone)]
pub struct CertificationService {
    pool: PgPool,
}

impl CertificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issues at most one certification per (user, level); concurrent callers
    /// converge on the first insert.
    pub async fn ensure_issued(
        &self,
        user_id: Uuid,
        level: i32,
        score: Decimal,
        issuing_organization: &str,
    ) -> Result<Option<UserCertification>> {
        let credential_id = generate_credential_id();
        let inserted = sqlx::query_as::<_, UserCertification>(
            r#"
            INSERT INTO user_certifications (user_id, level, score, credential_id, issuing_organization)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, level) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(score)
        .bind(&credential_id)
        .bind(issuing_organization)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(cert) = &inserted {
            tracing::info!(
                user_id = %user_id,
                level,
                credential_id = %cert.credential_id,
                "certification issued"
            );
        }
        Ok(inserted)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UserCertification>> {
        let certs = sqlx::query_as::<_, UserCertification>(
            r#"SELECT * FROM user_certifications WHERE user_id = $1 ORDER BY level ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(certs)
    }

    /// Public lookup. Malformed ids are answered without a database read.
    pub async fn verify(&self, credential_id: &str) -> Result<VerifyCertificationResponse> {
        if !is_valid_credential_id(credential_id) {
            return Ok(VerifyCertificationResponse::invalid(Some(
                INVALID_FORMAT_MESSAGE.to_string(),
            )));
        }

        let row = sqlx::query_as::<_, CertificationWithLevelName>(
            r#"
            SELECT c.*, lp.name AS level_name
            FROM user_certifications c
            JOIN level_pricing lp ON lp.level = c.level
            WHERE c.credential_id = $1
            "#,
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(VerifyCertificationResponse::invalid(None));
        };

        Ok(VerifyCertificationResponse {
            valid: true,
            credential_id: Some(row.credential_id),
            level: Some(row.level),
            level_name: Some(row.level_name),
            score: Some(row.score),
            certified_at: Some(row.certified_at),
            issuing_organization: Some(row.issuing_organization),
            expiration_date: row.expiration_date,
            error: None,
        })
    }

    /// Open Badge 2.0 assertion for a known credential id.
    pub async fn badge_assertion(&self, credential_id: &str) -> Result<BadgeAssertion> {
        if !is_valid_credential_id(credential_id) {
            return Err(Error::BadRequest(INVALID_FORMAT_MESSAGE.to_string()));
        }
        let row = sqlx::query_as::<_, CertificationWithRecipient>(
            r#"
            SELECT c.*, lp.name AS level_name, u.email AS recipient_email
            FROM user_certifications c
            JOIN level_pricing lp ON lp.level = c.level
            JOIN users u ON u.id = c.user_id
            WHERE c.credential_id = $1
            "#,
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown credential".to_string()))?;

        let config = get_config();
        Ok(BadgeAssertion {
            context: "https://w3id.org/openbadges/v2".to_string(),
            assertion_type: "Assertion".to_string(),
            id: format!(
                "{}/api/public/certifications/{}/badge",
                config.app_url, row.credential_id
            ),
            recipient: BadgeRecipient {
                recipient_type: "email".to_string(),
                hashed: false,
                identity: row.recipient_email,
            },
            badge: BadgeClass {
                badge_type: "BadgeClass".to_string(),
                name: format!("Certification niveau {}", row.level_name),
                description: format!(
                    "Niveau {} validé avec un score de {}%",
                    row.level_name, row.score
                ),
                issuer: BadgeIssuer {
                    issuer_type: "Issuer".to_string(),
                    name: row.issuing_organization,
                },
            },
            issued_on: row.certified_at,
            expires: row.expiration_date,
            verification: BadgeVerification {
                verification_type: "HostedBadge".to_string(),
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct CertificationWithLevelName {
    #[allow(dead_code)]
    id: Uuid,
    #[allow(dead_code)]
    user_id: Uuid,
    level: i32,
    score: Decimal,
    certified_at: chrono::DateTime<chrono::Utc>,
    credential_id: String,
    issuing_organization: String,
    expiration_date: Option<chrono::DateTime<chrono::Utc>>,
    level_name: String,
}

#[derive(sqlx::FromRow)]
struct CertificationWithRecipient {
    #[allow(dead_code)]
    id: Uuid,
    #[allow(dead_code)]
    user_id: Uuid,
    #[allow(dead_code)]
    level: i32,
    score: Decimal,
    certified_at: chrono::DateTime<chrono::Utc>,
    credential_id: String,
    issuing_organization: String,
    expiration_date: Option<chrono::DateTime<chrono::Utc>>,
    level_name: String,
    recipient_email: String,
}
