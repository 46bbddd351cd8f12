use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Running aggregate of responses for one question within one session.
///
/// `option_counts` counts option *selections*, not submissions: a
/// multi-select submission bumps several option counters while
/// `total_responses` moves by one, so `sum(option_counts)` may exceed
/// `total_responses`. `correct_count <= total_responses` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTally {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_code: i64,
    pub quiz_id: String,
    pub question_id: String,
    #[serde(default)]
    pub option_counts: HashMap<String, i64>,
    pub total_responses: i64,
    #[serde(default)]
    pub correct_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl ResponseTally {
    /// Natural composite key of the (session, quiz, question) triple.
    pub fn storage_id(session_code: i64, quiz_id: &str, question_id: &str) -> String {
        format!("{}:{}:{}", session_code, quiz_id, question_id)
    }

    pub fn empty(session_code: i64, quiz_id: &str, question_id: &str) -> Self {
        Self {
            id: Self::storage_id(session_code, quiz_id, question_id),
            session_code,
            quiz_id: quiz_id.to_string(),
            question_id: question_id.to_string(),
            option_counts: HashMap::new(),
            total_responses: 0,
            correct_count: 0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    /// Numeric session code, sent as a string on the wire.
    #[validate(length(min = 1, message = "session_code is required"))]
    pub session_code: String,
    #[validate(length(min = 1, message = "quiz_id is required"))]
    pub quiz_id: String,
    #[validate(length(min = 1, message = "question_id is required"))]
    pub question_id: String,
    #[serde(default)]
    pub selected_option_ids: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponseResponse {
    pub is_correct: bool,
    pub tally: ResponseTally,
}
