use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::{CreateQuestionRequest, UpdateQuestionRequest};
use crate::dto::session_dto::SessionQuestionsRequest;
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::test_session::SessionType;

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

/// Offset and row count for one regular session over a level's bank.
/// `percentage` of the bank makes one batch; the final batch is clamped to
/// the rows that actually exist.
pub fn batch_bounds(total: i64, percentage: i32, session_number: i32) -> (i64, i64) {
    let batch = total * percentage as i64 / 100;
    if batch <= 0 {
        return (0, 0);
    }
    let offset = (session_number as i64 - 1) * batch;
    if offset >= total {
        return (offset, 0);
    }
    (offset, batch.min(total - offset))
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_level(&self, level: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM questions WHERE level = $1"#)
            .bind(level)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Questions for one session, in stable position order. Regular sessions
    /// slice the bank by offset; remedial sessions return the caller's
    /// unremediated failures (possibly empty, never an error).
    pub async fn session_questions(
        &self,
        user_id: Uuid,
        req: &SessionQuestionsRequest,
        default_percentage: i32,
    ) -> Result<Vec<Question>> {
        match req.session_type {
            SessionType::Regular => {
                let percentage = req.questions_percentage.unwrap_or(default_percentage);
                if !(1..=100).contains(&percentage) {
                    return Err(Error::BadRequest(
                        "questions_percentage must be between 1 and 100".to_string(),
                    ));
                }
                let total = self.count_for_level(req.level).await?;
                let (offset, limit) = batch_bounds(total, percentage, req.session_number);
                if limit == 0 {
                    return Ok(Vec::new());
                }
                let questions = sqlx::query_as::<_, Question>(
                    r#"SELECT * FROM questions WHERE level = $1 ORDER BY position ASC OFFSET $2 LIMIT $3"#,
                )
                .bind(req.level)
                .bind(offset)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
                Ok(questions)
            }
            SessionType::Remedial => {
                let questions = sqlx::query_as::<_, Question>(
                    r#"
                    SELECT q.* FROM questions q
                    JOIN failed_questions f ON f.question_id = q.id
                    WHERE f.user_id = $1 AND f.level = $2 AND f.is_remediated = FALSE
                    ORDER BY q.position ASC
                    "#,
                )
                .bind(user_id)
                .bind(req.level)
                .fetch_all(&self.pool)
                .await?;
                Ok(questions)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Question> {
        let question = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(question)
    }

    pub async fn list_for_level(&self, level: i32) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE level = $1 ORDER BY position ASC"#,
        )
        .bind(level)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn create(&self, req: CreateQuestionRequest) -> Result<Question> {
        let position = match req.position {
            Some(p) => p,
            None => {
                let max: Option<i32> = sqlx::query_scalar(
                    r#"SELECT MAX(position) FROM questions WHERE level = $1"#,
                )
                .bind(req.level)
                .fetch_one(&self.pool)
                .await?;
                max.unwrap_or(0) + 1
            }
        };
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (level, position, content, question_type, rule, choices, answer, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(req.level)
        .bind(position)
        .bind(req.content)
        .bind(req.question_type)
        .bind(req.rule)
        .bind(req.choices.map(sqlx::types::Json))
        .bind(req.answer)
        .bind(req.explanation)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    pub async fn update(&self, id: Uuid, req: UpdateQuestionRequest) -> Result<Question> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions SET
                content = COALESCE($1, content),
                rule = COALESCE($2, rule),
                choices = COALESCE($3, choices),
                answer = COALESCE($4, answer),
                explanation = COALESCE($5, explanation)
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(req.content)
        .bind(req.rule)
        .bind(req.choices.map(sqlx::types::Json))
        .bind(req.answer)
        .bind(req.explanation)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM questions WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_the_session_number() {
        // 20% of 50 questions = batches of 10
        assert_eq!(batch_bounds(50, 20, 1), (0, 10));
        assert_eq!(batch_bounds(50, 20, 3), (20, 10));
        assert_eq!(batch_bounds(50, 20, 5), (40, 10));
    }

    #[test]
    fn final_batch_is_clamped_to_available_rows() {
        assert_eq!(batch_bounds(45, 20, 5), (36, 9));
        assert_eq!(batch_bounds(50, 20, 6), (50, 0));
        assert_eq!(batch_bounds(50, 20, 7), (60, 0));
    }

    #[test]
    fn empty_bank_yields_empty_batches() {
        assert_eq!(batch_bounds(0, 20, 1), (0, 0));
    }

    #[test]
    fn tiny_bank_with_small_percentage_yields_no_batch() {
        // 20% of 4 questions rounds down to zero rows per session
        assert_eq!(batch_bounds(4, 20, 1), (0, 0));
    }
}
