use sqlx::PgPool;

use crate::dto::admin_dto::UpdateSettingsRequest;
use crate::error::Result;
use crate::events::{EventHub, TOPIC_SETTINGS};
use crate::models::settings::{SiteSettingRow, SiteSettings};

#[derive(Clone)]
pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One typed snapshot per request instead of scattered key lookups.
    pub async fn load(&self) -> Result<SiteSettings> {
        let rows = sqlx::query_as::<_, SiteSettingRow>(r#"SELECT key, value FROM site_settings"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(SiteSettings::from_rows(&rows))
    }

    pub async fn update(&self, req: UpdateSettingsRequest, hub: &EventHub) -> Result<SiteSettings> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(v) = req.questions_percentage {
            pairs.push(("questions_percentage", v.to_string()));
        }
        if let Some(v) = req.anti_cheat_enabled {
            pairs.push(("anti_cheat_enabled", v.to_string()));
        }
        if let Some(v) = req.anti_cheat_max_violations {
            pairs.push(("anti_cheat_max_violations", v.to_string()));
        }
        if let Some(v) = req.issuing_organization {
            pairs.push(("issuing_organization", v));
        }
        if let Some(v) = req.footer_text {
            pairs.push(("footer_text", v));
        }

        for (key, value) in &pairs {
            sqlx::query(
                r#"
                INSERT INTO site_settings (key, value) VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        }

        let settings = self.load().await?;
        if !pairs.is_empty() {
            hub.publish(TOPIC_SETTINGS, serde_json::to_value(&settings)?);
        }
        Ok(settings)
    }
}
