use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{Question, Quiz};
use crate::storage::QuizStore;

/// Authoritative answer key for one question, derived from the quiz
/// definition. Never stored.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub correct_option_ids: BTreeSet<String>,
    pub option_ids: Vec<String>,
}

impl AnswerKey {
    pub fn from_question(question: &Question) -> Self {
        Self {
            correct_option_ids: question
                .options
                .iter()
                .filter(|o| o.is_correct)
                .map(|o| o.id.clone())
                .collect(),
            option_ids: question.options.iter().map(|o| o.id.clone()).collect(),
        }
    }

    /// Set equality is the correctness rule: a strict subset or superset of
    /// the correct options is wrong. This is what makes multi-answer
    /// questions grade properly.
    pub fn grades_correct(&self, selected: &BTreeSet<String>) -> bool {
        *selected == self.correct_option_ids
    }

    pub fn knows_option(&self, option_id: &str) -> bool {
        self.option_ids.iter().any(|id| id == option_id)
    }
}

/// Pure, read-only resolver; safe to call concurrently without
/// synchronization.
pub struct AnswerKeyResolver {
    quizzes: Arc<dyn QuizStore>,
}

impl AnswerKeyResolver {
    pub fn new(quizzes: Arc<dyn QuizStore>) -> Self {
        Self { quizzes }
    }

    pub async fn resolve(&self, quiz_id: &str, question_id: &str) -> Result<AnswerKey, ApiError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Quiz {} not found", quiz_id)))?;
        Self::key_for(&quiz, question_id)
    }

    /// Resolves against an already-loaded quiz; used when grading a whole
    /// attempt to avoid refetching the quiz per answer.
    pub fn key_for(quiz: &Quiz, question_id: &str) -> Result<AnswerKey, ApiError> {
        let question = quiz.question(question_id).ok_or_else(|| {
            ApiError::not_found(format!(
                "Question {} not found in quiz {}",
                question_id, quiz.id
            ))
        })?;
        Ok(AnswerKey::from_question(question))
    }
}
