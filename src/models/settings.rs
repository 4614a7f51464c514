use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteSettingRow {
    pub key: String,
    pub value: String,
}

/// Typed view over the site_settings key/value rows. Unknown keys are
/// ignored; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub questions_percentage: i32,
    pub anti_cheat_enabled: bool,
    pub anti_cheat_max_violations: i32,
    pub issuing_organization: String,
    pub footer_text: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            questions_percentage: 20,
            anti_cheat_enabled: true,
            anti_cheat_max_violations: 3,
            issuing_organization: "Certification Française".to_string(),
            footer_text: String::new(),
        }
    }
}

impl SiteSettings {
    pub fn from_rows(rows: &[SiteSettingRow]) -> Self {
        let mut settings = Self::default();
        for row in rows {
            match row.key.as_str() {
                "questions_percentage" => {
                    if let Ok(v) = row.value.parse() {
                        settings.questions_percentage = v;
                    }
                }
                "anti_cheat_enabled" => {
                    if let Ok(v) = row.value.parse() {
                        settings.anti_cheat_enabled = v;
                    }
                }
                "anti_cheat_max_violations" => {
                    if let Ok(v) = row.value.parse() {
                        settings.anti_cheat_max_violations = v;
                    }
                }
                "issuing_organization" => settings.issuing_organization = row.value.clone(),
                "footer_text" => settings.footer_text = row.value.clone(),
                _ => {}
            }
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> SiteSettingRow {
        SiteSettingRow {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn defaults_survive_missing_and_garbage_rows() {
        let rows = vec![
            row("questions_percentage", "not_a_number"),
            row("some_legacy_key", "whatever"),
        ];
        let s = SiteSettings::from_rows(&rows);
        assert_eq!(s.questions_percentage, 20);
        assert!(s.anti_cheat_enabled);
    }

    #[test]
    fn rows_override_defaults() {
        let rows = vec![
            row("questions_percentage", "25"),
            row("anti_cheat_enabled", "false"),
            row("issuing_organization", "Académie X"),
        ];
        let s = SiteSettings::from_rows(&rows);
        assert_eq!(s.questions_percentage, 25);
        assert!(!s.anti_cheat_enabled);
        assert_eq!(s.issuing_organization, "Académie X");
    }
}
