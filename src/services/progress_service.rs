use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::session_dto::{LevelProgressResponse, SessionProgressEntry, SessionState};
use crate::error::Result;
use crate::models::settings::SiteSettings;
use crate::models::test_session::{
    SessionStatus, SessionType, TestSession, PASS_THRESHOLD, REMEDIAL_SESSION_BASE,
};
use crate::services::access_service::AccessService;
use crate::services::certification_service::CertificationService;
use crate::services::email_service::EmailService;

/// How many regular sessions one level spans for a given batch percentage.
pub fn regular_session_count(percentage: i32) -> i32 {
    let percentage = percentage.clamp(1, 100);
    (100 + percentage - 1) / percentage
}

/// Rattrapage slots carry a `.R` suffix instead of a plain number.
pub fn session_label(session_number: i32) -> String {
    if session_number >= REMEDIAL_SESSION_BASE {
        format!("{}.R", session_number)
    } else {
        session_number.to_string()
    }
}

/// A session is completed below the pointer, current at it, and otherwise
/// available only once its predecessor passed.
pub fn session_state(session_number: i32, pointer: i32, prior_passed: bool) -> SessionState {
    if session_number < pointer {
        SessionState::Completed
    } else if session_number == pointer {
        SessionState::Current
    } else if prior_passed {
        SessionState::Available
    } else {
        SessionState::Locked
    }
}

pub fn level_validated(all_regular_passed: bool, open_failures: bool, remedial_passed: bool) -> bool {
    all_regular_passed && (!open_failures || remedial_passed)
}

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn completed_sessions(&self, user_id: Uuid, level: i32) -> Result<Vec<TestSession>> {
        let sessions = sqlx::query_as::<_, TestSession>(
            r#"
            SELECT * FROM test_sessions
            WHERE user_id = $1 AND level = $2 AND status = $3 AND deleted_at IS NULL
            ORDER BY session_number ASC, ended_at ASC
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(SessionStatus::Completed)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>> {
        let email: Option<String> =
            sqlx::query_scalar(r#"SELECT email FROM users WHERE id = $1 AND is_active = TRUE"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(email)
    }

    async fn open_failure_count(&self, user_id: Uuid, level: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM failed_questions
            WHERE user_id = $1 AND level = $2 AND is_remediated = FALSE
            "#,
        )
        .bind(user_id)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Full per-level view; issues the certification as a side effect the
    /// first time the level turns out validated.
    pub async fn level_progress(
        &self,
        user_id: Uuid,
        level: i32,
        settings: &SiteSettings,
    ) -> Result<LevelProgressResponse> {
        let pricing = AccessService::new(self.pool.clone())
            .level_pricing(level)
            .await?;
        let total = regular_session_count(settings.questions_percentage);
        let sessions = self.completed_sessions(user_id, level).await?;

        let pass = Decimal::from(PASS_THRESHOLD);
        let mut best_scores: HashMap<i32, Decimal> = HashMap::new();
        let mut remedial_score: Option<Decimal> = None;
        for s in &sessions {
            let Some(score) = s.score else { continue };
            if s.session_type == SessionType::Remedial
                || s.session_number >= REMEDIAL_SESSION_BASE
            {
                if remedial_score.map_or(true, |prev| score > prev) {
                    remedial_score = Some(score);
                }
            } else if best_scores
                .get(&s.session_number)
                .map_or(true, |prev| score > *prev)
            {
                best_scores.insert(s.session_number, score);
            }
        }

        let passed = |n: i32| best_scores.get(&n).map_or(false, |s| *s >= pass);
        let mut pointer = total + 1;
        for n in 1..=total {
            if !passed(n) {
                pointer = n;
                break;
            }
        }

        let mut entries: Vec<SessionProgressEntry> = (1..=total)
            .map(|n| {
                let prior_passed = n == 1 || passed(n - 1);
                SessionProgressEntry {
                    session_number: n,
                    label: session_label(n),
                    state: session_state(n, pointer, prior_passed),
                    score: best_scores.get(&n).copied(),
                }
            })
            .collect();

        let completed_count = (1..=total).filter(|n| passed(*n)).count() as i32;
        let all_regular_passed = completed_count == total;
        let open_failures = self.open_failure_count(user_id, level).await? > 0;
        let remedial_passed = remedial_score.map_or(false, |s| s >= pass);
        let remedial_required = all_regular_passed && open_failures && !remedial_passed;

        if remedial_required || remedial_score.is_some() {
            let state = if remedial_passed {
                SessionState::Completed
            } else if all_regular_passed {
                SessionState::Current
            } else {
                SessionState::Locked
            };
            entries.push(SessionProgressEntry {
                session_number: REMEDIAL_SESSION_BASE,
                label: session_label(REMEDIAL_SESSION_BASE),
                state,
                score: remedial_score,
            });
        }

        let validated = level_validated(all_regular_passed, open_failures, remedial_passed);
        if validated {
            let mean = if completed_count > 0 {
                best_scores.values().copied().sum::<Decimal>() / Decimal::from(completed_count)
            } else {
                Decimal::ZERO
            };
            let issued = CertificationService::new(self.pool.clone())
                .ensure_issued(user_id, level, mean, &settings.issuing_organization)
                .await?;
            if let Some(cert) = issued {
                if let Some(email) = self.user_email(user_id).await? {
                    let (subject, body) = crate::services::email_service::templates::certification_earned(
                        &pricing.name,
                        &cert.credential_id,
                    );
                    EmailService::new(self.pool.clone())
                        .enqueue(&email, &subject, &body)
                        .await?;
                }
            }
        }

        Ok(LevelProgressResponse {
            level,
            level_name: pricing.name,
            total_sessions: total,
            completed_sessions: completed_count,
            remedial_required,
            validated,
            sessions: entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_sessions_at_twenty_percent() {
        assert_eq!(regular_session_count(20), 5);
        assert_eq!(regular_session_count(25), 4);
        assert_eq!(regular_session_count(30), 4);
        assert_eq!(regular_session_count(100), 1);
    }

    #[test]
    fn remedial_numbers_get_the_rattrapage_suffix() {
        assert_eq!(session_label(3), "3");
        assert_eq!(session_label(99), "99.R");
        assert_eq!(session_label(100), "100.R");
    }

    #[test]
    fn states_follow_the_pointer() {
        assert_eq!(session_state(1, 3, true), SessionState::Completed);
        assert_eq!(session_state(2, 3, true), SessionState::Completed);
        assert_eq!(session_state(3, 3, true), SessionState::Current);
        assert_eq!(session_state(4, 3, true), SessionState::Available);
        assert_eq!(session_state(5, 3, false), SessionState::Locked);
    }

    #[test]
    fn validation_needs_every_regular_session() {
        assert!(!level_validated(false, false, false));
        assert!(level_validated(true, false, false));
    }

    #[test]
    fn open_failures_block_validation_until_remediation_passes() {
        assert!(!level_validated(true, true, false));
        assert!(level_validated(true, true, true));
    }
}
