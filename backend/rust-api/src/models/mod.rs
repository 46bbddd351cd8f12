use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod analytics;
pub mod reset;
pub mod score;
pub mod tally;

/// Quiz definition as served by the quiz store. Read-only from this service's
/// perspective; the answer key must not change while a live session
/// referencing the quiz is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
    #[serde(default)]
    pub points: Option<i32>,
}

/// Session registry entry: one live run of a quiz, identified by a short
/// numeric code and owned by a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSession {
    #[serde(rename = "_id")]
    pub code: i64,
    pub host_id: String,
    pub quiz_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
