use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dto::session_dto::SubmittedAnswer;
use crate::models::question::Question;
use crate::models::test_session::PASS_THRESHOLD;

#[derive(Debug, Clone)]
pub struct AnswerJudgment {
    pub question_id: Uuid,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub correct_count: usize,
    pub total: usize,
    pub score: Decimal,
    pub passed: bool,
    pub judgments: Vec<AnswerJudgment>,
}

pub struct GradingService;

impl GradingService {
    /// Trim surrounding whitespace, compare case-insensitively. Accents and
    /// punctuation are compared as-is.
    pub fn answers_match(stored: &str, submitted: &str) -> bool {
        stored.trim().to_lowercase() == submitted.trim().to_lowercase()
    }

    /// Grades a full session submission against the question rows. Questions
    /// without a submitted answer count as incorrect; submitted answers for
    /// unknown questions are ignored.
    pub fn grade_submission(questions: &[Question], answers: &[SubmittedAnswer]) -> GradedSubmission {
        let mut correct_count = 0;
        let mut judgments = Vec::with_capacity(questions.len());

        for q in questions {
            let submitted = answers.iter().find(|a| a.question_id == q.id);
            let is_correct =
                submitted.map_or(false, |a| Self::answers_match(&q.answer, &a.user_answer));
            if is_correct {
                correct_count += 1;
            }
            judgments.push(AnswerJudgment {
                question_id: q.id,
                is_correct,
            });
        }

        let total = questions.len();
        let score = if total == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(correct_count as i64 * 100) / Decimal::from(total as i64)
        };
        GradedSubmission {
            correct_count,
            total,
            score,
            passed: score >= Decimal::from(PASS_THRESHOLD),
            judgments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;
    use chrono::Utc;

    fn question(answer: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            level: 1,
            position: 1,
            content: "Complétez la phrase".to_string(),
            question_type: QuestionType::FreeText,
            rule: None,
            choices: None,
            answer: answer.to_string(),
            explanation: None,
            created_at: Utc::now(),
        }
    }

    fn answer_for(q: &Question, text: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: q.id,
            user_answer: text.to_string(),
        }
    }

    #[test]
    fn comparison_ignores_case_and_surrounding_whitespace() {
        assert!(GradingService::answers_match("chanté", "  CHANTÉ "));
        assert!(GradingService::answers_match("Les chevaux", "les chevaux"));
    }

    #[test]
    fn comparison_does_not_normalize_accents() {
        assert!(!GradingService::answers_match("chanté", "chante"));
    }

    #[test]
    fn comparison_rejects_any_other_input() {
        assert!(!GradingService::answers_match("chanté", "chanté."));
        assert!(!GradingService::answers_match("chanté", ""));
    }

    #[test]
    fn submission_scores_as_percentage() {
        let questions: Vec<Question> =
            vec![question("a"), question("b"), question("c"), question("d")];
        let answers = vec![
            answer_for(&questions[0], "A"),
            answer_for(&questions[1], "wrong"),
            answer_for(&questions[2], " c "),
            answer_for(&questions[3], "d"),
        ];
        let graded = GradingService::grade_submission(&questions, &answers);
        assert_eq!(graded.correct_count, 3);
        assert_eq!(graded.total, 4);
        assert_eq!(graded.score, Decimal::from(75));
        assert!(graded.passed);
    }

    #[test]
    fn sixty_percent_does_not_pass() {
        let questions: Vec<Question> = (0..5).map(|_| question("oui")).collect();
        let answers: Vec<SubmittedAnswer> = questions
            .iter()
            .take(3)
            .map(|q| answer_for(q, "oui"))
            .collect();
        let graded = GradingService::grade_submission(&questions, &answers);
        assert_eq!(graded.score, Decimal::from(60));
        assert!(!graded.passed);
    }

    #[test]
    fn missing_answers_count_as_incorrect() {
        let questions = vec![question("oui")];
        let graded = GradingService::grade_submission(&questions, &[]);
        assert_eq!(graded.correct_count, 0);
        assert!(!graded.judgments[0].is_correct);
    }

    #[test]
    fn empty_question_set_scores_zero() {
        let graded = GradingService::grade_submission(&[], &[]);
        assert_eq!(graded.score, Decimal::ZERO);
        assert!(!graded.passed);
    }
}
