use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::{
    AddLearnerRequest, AddLearnerResponse, AdminInvitationRequest, InviteUserResult,
    InviteUsersResponse,
};
use crate::error::{Error, Result};
use crate::models::user::{AdminCapability, User, UserRole};
use crate::services::email_service::{templates, EmailService};
use crate::utils::crypto::hash_password;
use crate::utils::token::generate_temporary_password;
use crate::utils::validation::{is_valid_email, sanitize_text};

const MAX_FIELD_LEN: usize = 100;

#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_learner(&self, req: AddLearnerRequest) -> Result<AddLearnerResponse> {
        let email = req.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(Error::BadRequest(format!("Invalid email: {}", email)));
        }

        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#)
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(Error::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let generated = req.password.is_none();
        let password = req
            .password
            .clone()
            .unwrap_or_else(generate_temporary_password);
        let password_hash = hash_password(&password)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, school, class_name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(req.first_name.as_deref().map(|s| sanitize_text(s, MAX_FIELD_LEN)))
        .bind(req.last_name.as_deref().map(|s| sanitize_text(s, MAX_FIELD_LEN)))
        .bind(req.school.as_deref().map(|s| sanitize_text(s, MAX_FIELD_LEN)))
        .bind(req.class_name.as_deref().map(|s| sanitize_text(s, MAX_FIELD_LEN)))
        .bind(&password_hash)
        .bind(UserRole::Learner)
        .fetch_one(&self.pool)
        .await?;

        let (subject, body) = templates::welcome(
            user.first_name.as_deref(),
            &user.email,
            generated.then_some(password.as_str()),
        );
        EmailService::new(self.pool.clone())
            .enqueue(&user.email, &subject, &body)
            .await?;

        Ok(AddLearnerResponse {
            success: true,
            user_id: user.id,
            email: user.email,
        })
    }

    /// One bad row does not abort the batch.
    pub async fn invite_users(&self, users: Vec<AddLearnerRequest>) -> InviteUsersResponse {
        let mut results = Vec::with_capacity(users.len());
        for req in users {
            let email = req.email.clone();
            match self.create_learner(req).await {
                Ok(created) => results.push(InviteUserResult {
                    email,
                    success: true,
                    user_id: Some(created.user_id),
                    error: None,
                }),
                Err(err) => results.push(InviteUserResult {
                    email,
                    success: false,
                    user_id: None,
                    error: Some(err.to_string()),
                }),
            }
        }
        let invited = results.iter().filter(|r| r.success).count();
        let failed = results.len() - invited;
        InviteUsersResponse {
            results,
            invited,
            failed,
        }
    }

    /// Soft-deactivates and anonymizes. Tolerant of accounts that are
    /// already gone; a second delete still reports success.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE,
                email = 'deleted+' || id::text || '@anonymized.invalid',
                first_name = NULL, last_name = NULL,
                school = NULL, class_name = NULL, city = NULL,
                password_hash = NULL,
                updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::info!(user_id = %user_id, "delete requested for missing or already-deleted user");
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE email = $1 AND is_active = TRUE"#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown user".to_string()))?;

        let temp_password = generate_temporary_password();
        let password_hash = hash_password(&temp_password)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;

        sqlx::query(r#"UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(&password_hash)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        let (subject, body) = templates::password_reset(&temp_password);
        EmailService::new(self.pool.clone())
            .enqueue(&user.email, &subject, &body)
            .await?;

        Ok("Un mot de passe temporaire a été envoyé".to_string())
    }

    /// Provisions an admin account with a closed capability set and sends
    /// the invitation email.
    pub async fn invite_admin(&self, req: AdminInvitationRequest) -> Result<AddLearnerResponse> {
        for cap in &req.capabilities {
            if AdminCapability::parse(cap).is_none() {
                return Err(Error::BadRequest(format!("Unknown capability: {}", cap)));
            }
        }

        let email = req.email.trim().to_lowercase();
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#)
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(Error::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let temp_password = generate_temporary_password();
        let password_hash = hash_password(&temp_password)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, password_hash, role, capabilities)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(req.first_name.as_deref().map(|s| sanitize_text(s, MAX_FIELD_LEN)))
        .bind(&password_hash)
        .bind(UserRole::Admin)
        .bind(&req.capabilities)
        .fetch_one(&self.pool)
        .await?;

        let (subject, body) = templates::admin_invitation(&user.email, &temp_password);
        EmailService::new(self.pool.clone())
            .enqueue(&user.email, &subject, &body)
            .await?;

        Ok(AddLearnerResponse {
            success: true,
            user_id: user.id,
            email: user.email,
        })
    }
}
