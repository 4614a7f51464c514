use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::session_dto::{
    StartSessionRequest, SubmitSessionRequest, SubmitSessionResponse, ValidateAnswerRequest,
    ValidateAnswerResponse, ViolationResponse,
};
use crate::error::{Error, Result};
use crate::models::settings::SiteSettings;
use crate::models::test_session::{SessionStatus, TestSession, PASS_THRESHOLD};
use crate::services::access_service::AccessService;
use crate::services::grading_service::GradingService;
use crate::services::progress_service::ProgressService;
use crate::services::question_service::QuestionService;

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_owned(&self, session_id: Uuid, user_id: Uuid) -> Result<TestSession> {
        let session = sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        session.ok_or_else(|| Error::NotFound("Session not found".to_string()))
    }

    pub async fn start(
        &self,
        user_id: Uuid,
        req: &StartSessionRequest,
        settings: &SiteSettings,
    ) -> Result<TestSession> {
        AccessService::new(self.pool.clone())
            .check_session_access(user_id, req.level)
            .await?;

        let already_passed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM test_sessions
                WHERE user_id = $1 AND level = $2 AND session_number = $3
                  AND status = $4 AND score >= $5 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(req.level)
        .bind(req.session_number)
        .bind(SessionStatus::Completed)
        .bind(rust_decimal::Decimal::from(PASS_THRESHOLD))
        .fetch_one(&self.pool)
        .await?;
        if already_passed {
            return Err(Error::Conflict("Session already validated".to_string()));
        }

        let question_count = QuestionService::new(self.pool.clone())
            .session_questions(
                user_id,
                &crate::dto::session_dto::SessionQuestionsRequest {
                    level: req.level,
                    session_number: req.session_number,
                    session_type: req.session_type,
                    questions_percentage: None,
                },
                settings.questions_percentage,
            )
            .await?
            .len() as i32;

        let session = sqlx::query_as::<_, TestSession>(
            r#"
            INSERT INTO test_sessions (user_id, level, session_number, session_type, status, question_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(req.level)
        .bind(req.session_number)
        .bind(req.session_type)
        .bind(SessionStatus::InProgress)
        .bind(question_count)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    /// Grades the submission, records failures, completes the session and
    /// re-derives level progress (which issues the certification when the
    /// level flips to validated).
    pub async fn submit(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        req: &SubmitSessionRequest,
        settings: &SiteSettings,
    ) -> Result<SubmitSessionResponse> {
        let session = self.get_owned(session_id, user_id).await?;
        match session.status {
            SessionStatus::InProgress => {}
            SessionStatus::Completed => {
                return Err(Error::Conflict("Session already submitted".to_string()))
            }
            SessionStatus::Terminated => {
                return Err(Error::Conflict(
                    "Session was terminated for rule violations".to_string(),
                ))
            }
        }

        // The batch is deterministic for a session slot, so re-derive it and
        // grade the whole batch; unanswered questions count as incorrect.
        let questions = QuestionService::new(self.pool.clone())
            .session_questions(
                user_id,
                &crate::dto::session_dto::SessionQuestionsRequest {
                    level: session.level,
                    session_number: session.session_number,
                    session_type: session.session_type,
                    questions_percentage: None,
                },
                settings.questions_percentage,
            )
            .await?;
        if questions.is_empty() {
            return Err(Error::BadRequest("Session has no questions".to_string()));
        }

        let graded = GradingService::grade_submission(&questions, &req.answers);

        for judgment in &graded.judgments {
            if judgment.is_correct {
                self.mark_remediated(user_id, judgment.question_id).await?;
            } else {
                self.record_failure(user_id, session.level, judgment.question_id)
                    .await?;
            }
        }

        // Guard against two racing submits: only one gets to complete the row.
        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET status = $1, score = $2, ended_at = NOW(), updated_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(SessionStatus::Completed)
        .bind(graded.score)
        .bind(session_id)
        .bind(SessionStatus::InProgress)
        .fetch_optional(&self.pool)
        .await?;
        if updated.is_none() {
            return Err(Error::Conflict("Session already submitted".to_string()));
        }

        ProgressService::new(self.pool.clone())
            .level_progress(user_id, session.level, settings)
            .await?;

        Ok(SubmitSessionResponse {
            session_id,
            score: graded.score,
            passed: graded.passed,
            correct_count: graded.correct_count,
            total: graded.total,
        })
    }

    /// Single-answer check: trimmed, case-insensitive comparison against the
    /// stored answer. The stored answer never leaves the server; explanation
    /// and rule come back only when the answer was wrong.
    pub async fn validate_answer(
        &self,
        user_id: Uuid,
        req: &ValidateAnswerRequest,
    ) -> Result<ValidateAnswerResponse> {
        let question = QuestionService::new(self.pool.clone())
            .get(req.question_id)
            .await?;

        let is_correct = GradingService::answers_match(&question.answer, &req.user_answer);
        if is_correct {
            self.mark_remediated(user_id, question.id).await?;
            Ok(ValidateAnswerResponse {
                is_correct: true,
                explanation: None,
                rule: None,
            })
        } else {
            self.record_failure(user_id, question.level, question.id)
                .await?;
            Ok(ValidateAnswerResponse {
                is_correct: false,
                explanation: question.explanation,
                rule: question.rule,
            })
        }
    }

    /// Anti-cheat report. Counts violations on the session row and, once the
    /// configured threshold is reached with the toggle on, terminates it.
    pub async fn report_violation(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        reason: &str,
        settings: &SiteSettings,
    ) -> Result<ViolationResponse> {
        let session = self.get_owned(session_id, user_id).await?;
        if session.status != SessionStatus::InProgress {
            return Err(Error::Conflict("Session is not in progress".to_string()));
        }

        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET violation_count = violation_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::warn!(
            session_id = %session_id,
            user_id = %user_id,
            reason,
            count = updated.violation_count,
            "anti-cheat violation reported"
        );

        let terminate = settings.anti_cheat_enabled
            && updated.violation_count >= settings.anti_cheat_max_violations;
        if terminate {
            sqlx::query(
                r#"
                UPDATE test_sessions
                SET status = $1, ended_at = NOW(), updated_at = NOW()
                WHERE id = $2 AND status = $3
                "#,
            )
            .bind(SessionStatus::Terminated)
            .bind(session_id)
            .bind(SessionStatus::InProgress)
            .execute(&self.pool)
            .await?;
        }

        Ok(ViolationResponse {
            violation_count: updated.violation_count,
            terminated: terminate,
        })
    }

    async fn record_failure(&self, user_id: Uuid, level: i32, question_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO failed_questions (user_id, level, question_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, question_id) DO UPDATE SET is_remediated = FALSE
            "#,
        )
        .bind(user_id)
        .bind(level)
        .bind(question_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_remediated(&self, user_id: Uuid, question_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE failed_questions SET is_remediated = TRUE
            WHERE user_id = $1 AND question_id = $2 AND is_remediated = FALSE
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
