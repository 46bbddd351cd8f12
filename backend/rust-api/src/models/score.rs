use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One graded answer inside a recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: String,
    pub selected_option_ids: BTreeSet<String>,
    pub is_correct: bool,
}

/// Durable record of one participant's full quiz attempt within one session,
/// immutable after creation. Keyed by `participant_id + session_code` so a
/// retried submission cannot create a second record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub participant_id: String,
    pub participant_display_name: String,
    pub session_code: i64,
    pub quiz_id: String,
    pub answers: Vec<AnswerEntry>,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percentage: f64,
    pub created_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn storage_id(participant_id: &str, session_code: i64) -> String {
        format!("{}:{}", participant_id, session_code)
    }
}

/// A single answer as submitted by the client, before grading.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    #[serde(default)]
    pub selected_option_ids: BTreeSet<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordAttemptRequest {
    #[validate(length(min = 1, message = "participant_id is required"))]
    pub participant_id: String,
    #[validate(length(min = 1, message = "participant_display_name is required"))]
    pub participant_display_name: String,
    #[validate(length(min = 1, message = "session_code is required"))]
    pub session_code: String,
    #[validate(length(min = 1, message = "quiz_id is required"))]
    pub quiz_id: String,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    /// Client-declared question count; reconciled against the authoritative
    /// quiz length before any percentage is computed.
    #[validate(range(min = 1, message = "declared_total_questions must be positive"))]
    pub declared_total_questions: u32,
}
