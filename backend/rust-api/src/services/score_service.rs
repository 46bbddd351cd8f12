use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::ApiError;
use crate::metrics::ATTEMPTS_RECORDED_TOTAL;
use crate::models::score::{AnswerEntry, RecordAttemptRequest, ScoreRecord};
use crate::services::answer_key::AnswerKeyResolver;
use crate::services::parse_session_code;
use crate::storage::{InsertOutcome, QuizStore, ScoreStore};
use crate::utils::retry::{retry_reads, RetryConfig};

/// Outcome of recording an attempt: the persisted record plus whether this
/// call created it (a matching retry replays the stored record instead).
pub struct RecordedAttempt {
    pub record: ScoreRecord,
    pub created: bool,
}

pub struct ScoreService {
    quizzes: Arc<dyn QuizStore>,
    scores: Arc<dyn ScoreStore>,
}

impl ScoreService {
    pub fn new(quizzes: Arc<dyn QuizStore>, scores: Arc<dyn ScoreStore>) -> Self {
        Self { quizzes, scores }
    }

    pub async fn record_attempt(
        &self,
        req: &RecordAttemptRequest,
    ) -> Result<RecordedAttempt, ApiError> {
        let session_code = parse_session_code(&req.session_code)?;

        let quiz = self
            .quizzes
            .get_quiz(&req.quiz_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Quiz {} not found", req.quiz_id)))?;

        // The authoritative question count wins over the client-declared one;
        // the percentage is always computed against the quiz definition.
        let total_questions = quiz.questions.len() as u32;
        if total_questions == 0 {
            return Err(ApiError::invalid_argument(format!(
                "Quiz {} has no questions to score against",
                quiz.id
            )));
        }
        if req.declared_total_questions != total_questions {
            tracing::warn!(
                "Participant {} declared {} questions for quiz {}, authoritative count is {}",
                req.participant_id,
                req.declared_total_questions,
                quiz.id,
                total_questions
            );
        }

        if req.answers.len() > total_questions as usize {
            return Err(ApiError::invalid_argument(format!(
                "Attempt has {} answers but quiz {} only has {} questions",
                req.answers.len(),
                quiz.id,
                total_questions
            )));
        }

        // Each question may be answered at most once per attempt; without
        // this check a repeated known-correct answer would count twice.
        let mut seen_questions = HashSet::with_capacity(req.answers.len());
        let mut answers = Vec::with_capacity(req.answers.len());
        for submitted in &req.answers {
            if !seen_questions.insert(submitted.question_id.as_str()) {
                return Err(ApiError::invalid_argument(format!(
                    "Attempt answers question {} more than once",
                    submitted.question_id
                )));
            }
            let key = AnswerKeyResolver::key_for(&quiz, &submitted.question_id)?;
            answers.push(AnswerEntry {
                question_id: submitted.question_id.clone(),
                selected_option_ids: submitted.selected_option_ids.clone(),
                is_correct: key.grades_correct(&submitted.selected_option_ids),
            });
        }

        let correct_answers = answers.iter().filter(|a| a.is_correct).count() as u32;
        let score_percentage = 100.0 * f64::from(correct_answers) / f64::from(total_questions);

        let record = ScoreRecord {
            id: ScoreRecord::storage_id(&req.participant_id, session_code),
            participant_id: req.participant_id.clone(),
            participant_display_name: req.participant_display_name.clone(),
            session_code,
            quiz_id: req.quiz_id.clone(),
            answers,
            total_questions,
            correct_answers,
            score_percentage,
            created_at: Utc::now(),
        };

        match self.scores.insert(&record).await? {
            InsertOutcome::Inserted => {
                ATTEMPTS_RECORDED_TOTAL.with_label_values(&["recorded"]).inc();
                tracing::info!(
                    "Recorded attempt: participant={}, session={}, score={:.1}%",
                    record.participant_id,
                    session_code,
                    record.score_percentage
                );
                Ok(RecordedAttempt {
                    record,
                    created: true,
                })
            }
            InsertOutcome::Duplicate(existing) => {
                if existing.quiz_id == record.quiz_id && existing.answers == record.answers {
                    // Retried submission with the same payload: idempotent.
                    ATTEMPTS_RECORDED_TOTAL.with_label_values(&["replayed"]).inc();
                    Ok(RecordedAttempt {
                        record: existing,
                        created: false,
                    })
                } else {
                    ATTEMPTS_RECORDED_TOTAL.with_label_values(&["conflict"]).inc();
                    Err(ApiError::conflict(format!(
                        "An attempt with different answers already exists for this participant and session (record {})",
                        existing.id
                    )))
                }
            }
        }
    }

    pub async fn get_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoreRecord>, ApiError> {
        let records = retry_reads(RetryConfig::default(), || async {
            self.scores.find_by_participant(participant_id).await
        })
        .await?;
        Ok(records)
    }

    pub async fn get_by_session(&self, session_code_raw: &str) -> Result<Vec<ScoreRecord>, ApiError> {
        let session_code = parse_session_code(session_code_raw)?;
        let records = retry_reads(RetryConfig::default(), || async {
            self.scores.find_by_session(session_code).await
        })
        .await?;
        Ok(records)
    }

    pub async fn get_by_session_and_participant(
        &self,
        session_code_raw: &str,
        participant_id: &str,
    ) -> Result<ScoreRecord, ApiError> {
        let session_code = parse_session_code(session_code_raw)?;
        let record = retry_reads(RetryConfig::default(), || async {
            self.scores
                .find_by_session_and_participant(session_code, participant_id)
                .await
        })
        .await?;
        record.ok_or_else(|| {
            ApiError::not_found(format!(
                "No score recorded for participant {} in session {}",
                participant_id, session_code
            ))
        })
    }
}
