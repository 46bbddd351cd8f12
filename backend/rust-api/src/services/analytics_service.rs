use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::analytics::{OptionBreakdown, QuestionBreakdown, SessionAnalytics};
use crate::models::tally::ResponseTally;
use crate::models::Quiz;
use crate::storage::{QuizStore, ScoreStore, SessionRegistry, TallyStore};
use crate::utils::retry::{retry_reads, RetryConfig};

/// Read-only aggregation over the score ledger and the response tallies.
/// Computes the host dashboard: histogram, averages, per-question breakdown.
pub struct AnalyticsService {
    quizzes: Arc<dyn QuizStore>,
    sessions: Arc<dyn SessionRegistry>,
    tallies: Arc<dyn TallyStore>,
    scores: Arc<dyn ScoreStore>,
}

impl AnalyticsService {
    pub fn new(
        quizzes: Arc<dyn QuizStore>,
        sessions: Arc<dyn SessionRegistry>,
        tallies: Arc<dyn TallyStore>,
        scores: Arc<dyn ScoreStore>,
    ) -> Self {
        Self {
            quizzes,
            sessions,
            tallies,
            scores,
        }
    }

    pub async fn session_analytics(
        &self,
        session_code: i64,
        requesting_host_id: &str,
    ) -> Result<SessionAnalytics, ApiError> {
        let session = self
            .sessions
            .get_session(session_code)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Session {} not found", session_code)))?;

        if session.host_id != requesting_host_id {
            return Err(ApiError::forbidden(
                "Only the owning host may read session analytics",
            ));
        }

        let quiz = self
            .quizzes
            .get_quiz(&session.quiz_id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!(
                    "Quiz {} referenced by session {} not found",
                    session.quiz_id, session_code
                ))
            })?;

        let records = retry_reads(RetryConfig::default(), || async {
            self.scores.find_by_session(session_code).await
        })
        .await?;
        let tallies = retry_reads(RetryConfig::default(), || async {
            self.tallies.list_for_quiz(session_code, &quiz.id).await
        })
        .await?;

        let student_count = records.len() as u64;
        let total_questions = quiz.questions.len() as u64;
        let total_correct: u64 = records.iter().map(|r| u64::from(r.correct_answers)).sum();
        let total_possible_answers = total_questions * student_count;

        let average_correct_percent = if total_possible_answers == 0 {
            0.0
        } else {
            100.0 * total_correct as f64 / total_possible_answers as f64
        };

        let mut score_buckets = [0u64; 10];
        for record in &records {
            score_buckets[bucket_index(record.score_percentage)] += 1;
        }

        let per_question = build_question_breakdowns(&quiz, tallies);

        Ok(SessionAnalytics {
            session_code,
            quiz_id: quiz.id,
            student_count,
            total_questions,
            total_correct,
            total_possible_answers,
            average_correct_percent,
            score_buckets,
            per_question,
        })
    }
}

/// Ten fixed 10-point buckets; a 100% score clamps into bucket 9 instead of
/// overflowing into a nonexistent bucket 10.
pub(crate) fn bucket_index(percent: f64) -> usize {
    let idx = (percent / 10.0).floor();
    if idx < 0.0 {
        0
    } else if idx > 9.0 {
        9
    } else {
        idx as usize
    }
}

fn build_question_breakdowns(
    quiz: &Quiz,
    tallies: Vec<ResponseTally>,
) -> Vec<QuestionBreakdown> {
    let mut by_question: HashMap<String, ResponseTally> = tallies
        .into_iter()
        .map(|t| (t.question_id.clone(), t))
        .collect();

    quiz.questions
        .iter()
        .map(|question| {
            let tally = by_question.remove(&question.id);

            let mut options: Vec<OptionBreakdown> = question
                .options
                .iter()
                .map(|option| OptionBreakdown {
                    option_id: option.id.clone(),
                    text: Some(option.text.clone()),
                    is_correct: option.is_correct,
                    count: tally
                        .as_ref()
                        .and_then(|t| t.option_counts.get(&option.id).copied())
                        .unwrap_or(0),
                })
                .collect();

            // Counters recorded against ids the quiz no longer knows about
            // (option churn) are still surfaced rather than hidden.
            if let Some(tally) = &tally {
                let mut unknown: Vec<_> = tally
                    .option_counts
                    .iter()
                    .filter(|(id, _)| !question.options.iter().any(|o| &o.id == *id))
                    .collect();
                unknown.sort_by(|a, b| a.0.cmp(b.0));
                for (id, count) in unknown {
                    options.push(OptionBreakdown {
                        option_id: id.clone(),
                        text: None,
                        is_correct: false,
                        count: *count,
                    });
                }
            }

            QuestionBreakdown {
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                options,
                total_responses: tally.as_ref().map_or(0, |t| t.total_responses),
                correct_count: tally.as_ref().map_or(0, |t| t.correct_count),
            }
        })
        .collect()
}
