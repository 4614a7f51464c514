use reqwest::Client;
use serde_json::json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::email_log::EmailLog;

#[derive(Clone)]
pub struct EmailService {
    pool: PgPool,
    client: Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl EmailService {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self {
            pool,
            client: Client::new(),
            api_base: config.email_api_base.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
        }
    }

    /// Writes to the outbox; the worker delivers later. The triggering
    /// request never waits on the provider.
    pub async fn enqueue(&self, recipient: &str, subject: &str, body_html: &str) -> Result<EmailLog> {
        let row = sqlx::query_as::<_, EmailLog>(
            r#"
            INSERT INTO email_logs (recipient, subject, body_html, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(recipient)
        .bind(subject)
        .bind(body_html)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn deliver_once(&self, log_id: Uuid) -> Result<()> {
        let log = sqlx::query_as::<_, EmailLog>(r#"SELECT * FROM email_logs WHERE id = $1"#)
            .bind(log_id)
            .fetch_one(&self.pool)
            .await?;

        let payload = json!({
            "from": self.from,
            "to": [log.recipient],
            "subject": log.subject,
            "html": log.body_html,
        });

        let res = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        match res {
            Ok(resp) if resp.status().is_success() => {
                let provider_id = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v["id"].as_str().map(|s| s.to_string()));
                sqlx::query(
                    r#"
                    UPDATE email_logs
                    SET status = 'sent', provider_id = $1,
                        attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(provider_id)
                .bind(log.id)
                .execute(&self.pool)
                .await?;
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(email_id = %log.id, status, "email provider rejected send");
                self.mark_failed(log.id, &body).await?;
            }
            Err(err) => {
                self.mark_failed(log.id, &err.to_string()).await?;
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, log_id: Uuid, detail: &str) -> Result<()> {
        tracing::warn!(email_id = %log_id, detail, "email delivery failed");
        sqlx::query(
            r#"
            UPDATE email_logs
            SET status = 'failed', attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(log_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Claims and delivers one pending row; failed rows are rescheduled with
    /// exponential backoff until max_attempts. Returns whether work was done.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"
            SELECT id FROM email_logs
            WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row2 =
            sqlx::query(r#"SELECT attempts, max_attempts, status FROM email_logs WHERE id = $1"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        let attempts: i32 = row2.try_get::<Option<i32>, _>("attempts")?.unwrap_or(0);
        let max_attempts: i32 = row2.try_get::<Option<i32>, _>("max_attempts")?.unwrap_or(3);
        let status: String = row2
            .try_get::<Option<String>, _>("status")?
            .unwrap_or_default();

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"
                UPDATE email_logs
                SET status = 'pending',
                    next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts - 1))::int))
                WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }
        Ok(true)
    }
}

/// Static HTML templates, French copy.
pub mod templates {
    pub fn welcome(first_name: Option<&str>, email: &str, temp_password: Option<&str>) -> (String, String) {
        let greeting = first_name.unwrap_or("Bonjour");
        let credentials = match temp_password {
            Some(pw) => format!(
                "<p>Identifiant : <strong>{}</strong><br/>Mot de passe temporaire : <strong>{}</strong></p>",
                email, pw
            ),
            None => format!("<p>Identifiant : <strong>{}</strong></p>", email),
        };
        (
            "Bienvenue sur la plateforme de certification".to_string(),
            format!(
                r#"<html><body>
<h2>{greeting},</h2>
<p>Votre compte apprenant vient d'être créé.</p>
{credentials}
<p>Connectez-vous pour commencer vos sessions de test.</p>
</body></html>"#
            ),
        )
    }

    pub fn admin_invitation(email: &str, temp_password: &str) -> (String, String) {
        (
            "Invitation administrateur".to_string(),
            format!(
                r#"<html><body>
<h2>Bonjour,</h2>
<p>Un compte administrateur a été créé pour <strong>{email}</strong>.</p>
<p>Mot de passe temporaire : <strong>{temp_password}</strong></p>
<p>Merci de le modifier dès votre première connexion.</p>
</body></html>"#
            ),
        )
    }

    pub fn password_reset(temp_password: &str) -> (String, String) {
        (
            "Réinitialisation de votre mot de passe".to_string(),
            format!(
                r#"<html><body>
<h2>Bonjour,</h2>
<p>Votre mot de passe a été réinitialisé par un administrateur.</p>
<p>Mot de passe temporaire : <strong>{temp_password}</strong></p>
</body></html>"#
            ),
        )
    }

    pub fn login_reminder(email: &str, app_url: &str) -> (String, String) {
        (
            "Votre accès à la plateforme de certification".to_string(),
            format!(
                r#"<html><body>
<h2>Bonjour,</h2>
<p>Votre compte <strong>{email}</strong> vous attend.</p>
<p><a href="{app_url}">Connectez-vous</a> pour reprendre vos sessions de test.</p>
</body></html>"#
            ),
        )
    }

    pub fn certification_earned(level_name: &str, credential_id: &str) -> (String, String) {
        (
            format!("Félicitations : niveau {} validé", level_name),
            format!(
                r#"<html><body>
<h2>Félicitations !</h2>
<p>Vous avez validé le niveau <strong>{level_name}</strong>.</p>
<p>Votre identifiant de certification : <strong>{credential_id}</strong></p>
</body></html>"#
            ),
        )
    }
}
