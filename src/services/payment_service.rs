use chrono::{Duration, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::dto::payment_dto::GatewayEvent;
use crate::error::{Error, Result};
use crate::models::level::LevelPricing;
use crate::models::promo_code::PromoCode;
use crate::models::purchase::{PurchaseStatus, UserLevelPurchase};

/// Checkout session as the gateway returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: Option<String>,
    pub client_reference_id: Option<String>,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    client: Client,
    api_base: String,
    api_key: String,
    app_url: String,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self {
            pool,
            client: Client::new(),
            api_base: config.payment_api_base.clone(),
            api_key: config.payment_api_key.clone(),
            app_url: config.app_url.clone(),
        }
    }

    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        pricing: &LevelPricing,
    ) -> Result<GatewayCheckoutSession> {
        let amount_cents = (pricing.price * rust_decimal::Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| Error::Internal("price out of range".to_string()))?;

        let params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("client_reference_id".into(), user_id.to_string()),
            (
                "success_url".into(),
                format!(
                    "{}/paiement/retour?session_id={{CHECKOUT_SESSION_ID}}",
                    self.app_url
                ),
            ),
            (
                "cancel_url".into(),
                format!("{}/paiement/annule", self.app_url),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                pricing.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                format!("Accès niveau {}", pricing.name),
            ),
            ("metadata[level]".into(), pricing.level.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.api_key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("checkout creation failed: {}", body)));
        }
        Ok(response.json::<GatewayCheckoutSession>().await?)
    }

    async fn fetch_checkout_session(&self, session_id: &str) -> Result<GatewayCheckoutSession> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base, session_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("checkout lookup failed: {}", body)));
        }
        Ok(response.json::<GatewayCheckoutSession>().await?)
    }

    /// Starts a purchase: paid level only, one completed purchase per
    /// user/level. Returns the gateway redirect URL.
    pub async fn create_payment(&self, user_id: Uuid, level: i32) -> Result<String> {
        let pricing =
            sqlx::query_as::<_, LevelPricing>(r#"SELECT * FROM level_pricing WHERE level = $1"#)
                .bind(level)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Unknown level".to_string()))?;

        if pricing.price <= rust_decimal::Decimal::ZERO {
            return Err(Error::BadRequest(
                "This level has no paid access".to_string(),
            ));
        }

        let already_owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_level_purchases
                WHERE user_id = $1 AND level = $2 AND status = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(PurchaseStatus::Completed)
        .fetch_one(&self.pool)
        .await?;
        if already_owned {
            return Err(Error::Conflict("Level already purchased".to_string()));
        }

        let checkout = self.create_checkout_session(user_id, &pricing).await?;
        let url = checkout
            .url
            .clone()
            .ok_or_else(|| Error::Gateway("checkout session has no url".to_string()))?;
        let parsed = url::Url::parse(&url)
            .map_err(|_| Error::Gateway("checkout url is not a valid URL".to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Gateway("checkout url has an unexpected scheme".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO user_level_purchases (user_id, level, price_paid, payment_reference, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(pricing.price)
        .bind(&checkout.id)
        .bind(PurchaseStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(url)
    }

    /// Flips a pending purchase to completed. Safe to call from the webhook,
    /// the client verify path and the reconciler at once; only the first
    /// transition writes.
    async fn complete_purchase(
        &self,
        payment_reference: &str,
        expected_user: Option<Uuid>,
    ) -> Result<Option<i32>> {
        let purchase = sqlx::query_as::<_, UserLevelPurchase>(
            r#"SELECT * FROM user_level_purchases WHERE payment_reference = $1"#,
        )
        .bind(payment_reference)
        .fetch_optional(&self.pool)
        .await?;

        let Some(purchase) = purchase else {
            return Ok(None);
        };
        if let Some(expected) = expected_user {
            if purchase.user_id != expected {
                return Err(Error::Forbidden(
                    "Payment session does not belong to this user".to_string(),
                ));
            }
        }
        if purchase.status == PurchaseStatus::Completed {
            return Ok(Some(purchase.level));
        }

        sqlx::query(
            r#"
            UPDATE user_level_purchases
            SET status = $1, completed_at = NOW()
            WHERE payment_reference = $2 AND status = $3
            "#,
        )
        .bind(PurchaseStatus::Completed)
        .bind(payment_reference)
        .bind(PurchaseStatus::Pending)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = %purchase.user_id,
            level = purchase.level,
            reference = payment_reference,
            "level purchase completed"
        );
        Ok(Some(purchase.level))
    }

    /// Client-return confirmation. The gateway must report the session paid
    /// and tied to the calling user.
    pub async fn verify_payment(&self, user_id: Uuid, session_id: &str) -> Result<Option<i32>> {
        let checkout = self.fetch_checkout_session(session_id).await?;
        if checkout.payment_status.as_deref() != Some("paid") {
            return Ok(None);
        }
        let reference_user = checkout
            .client_reference_id
            .as_deref()
            .and_then(|s| s.parse::<Uuid>().ok());
        if reference_user != Some(user_id) {
            return Err(Error::Forbidden(
                "Payment session does not belong to this user".to_string(),
            ));
        }
        self.complete_purchase(&checkout.id, Some(user_id)).await
    }

    /// Webhook-driven completion; signature verification happens in the
    /// route before the event reaches this method.
    pub async fn handle_gateway_event(&self, event: &GatewayEvent) -> Result<Option<i32>> {
        if event.event_type != "checkout.session.completed" {
            return Ok(None);
        }
        let object = &event.data.object;
        if object.payment_status.as_deref() != Some("paid") {
            return Ok(None);
        }
        self.complete_purchase(&object.id, None).await
    }

    pub async fn redeem_promo(&self, user_id: Uuid, code: &str, level: i32) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let promo = sqlx::query_as::<_, PromoCode>(
            r#"SELECT * FROM promo_codes WHERE code = $1 FOR UPDATE"#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown promo code".to_string()))?;

        if !promo.is_usable_for(level, Utc::now()) {
            return Err(Error::BadRequest("Promo code is not usable".to_string()));
        }

        sqlx::query(r#"UPDATE promo_codes SET use_count = use_count + 1 WHERE code = $1"#)
            .bind(code)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_level_purchases (user_id, level, price_paid, payment_reference, status, completed_at)
            VALUES ($1, $2, 0, $3, $4, NOW())
            ON CONFLICT (payment_reference) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(format!("promo:{}:{}", code, user_id))
        .bind(PurchaseStatus::Completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Reconciliation worker step: re-poll one stale pending purchase so a
    /// paid session cannot stay pending just because the client never came
    /// back. Returns whether a row was examined.
    pub async fn reconcile_stale_pending(&self, older_than_minutes: i64) -> Result<bool> {
        let cutoff = Utc::now() - Duration::minutes(older_than_minutes);
        let row = sqlx::query(
            r#"
            SELECT payment_reference FROM user_level_purchases
            WHERE status = 'pending' AND created_at <= $1
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(false) };
        let reference: String = row.try_get("payment_reference")?;

        match self.fetch_checkout_session(&reference).await {
            Ok(checkout) if checkout.payment_status.as_deref() == Some("paid") => {
                self.complete_purchase(&reference, None).await?;
            }
            Ok(_) => {
                tracing::debug!(reference, "pending purchase still unpaid at gateway");
            }
            Err(err) => {
                tracing::warn!(reference, error = %err, "reconciliation lookup failed");
            }
        }
        Ok(true)
    }
}
