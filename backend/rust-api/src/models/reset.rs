use serde::{Deserialize, Serialize};

/// Host-requested bulk deletion, scoped by session, session+quiz, or
/// session+quiz+question. Tagged so the scope is explicit on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ResetRequest {
    Session {
        session_code: String,
    },
    Quiz {
        session_code: String,
        quiz_id: String,
    },
    Question {
        session_code: String,
        quiz_id: String,
        question_id: String,
    },
}

impl ResetRequest {
    pub fn session_code(&self) -> &str {
        match self {
            ResetRequest::Session { session_code }
            | ResetRequest::Quiz { session_code, .. }
            | ResetRequest::Question { session_code, .. } => session_code,
        }
    }

    pub fn scope_label(&self) -> &'static str {
        match self {
            ResetRequest::Session { .. } => "session",
            ResetRequest::Quiz { .. } => "quiz",
            ResetRequest::Question { .. } => "question",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetOutcome {
    pub tallies_deleted: u64,
    pub scores_deleted: u64,
}
