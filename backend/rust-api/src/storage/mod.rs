use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{score::ScoreRecord, tally::ResponseTally, LiveSession, Quiz};

pub mod memory;
pub mod mongo;

/// Storage-layer failure. Everything in here is treated as transient by the
/// services; reads go through the retry helper, writes never do (a blindly
/// retried increment could double-count).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Deletion scope for tally records; narrows as more fields are supplied.
#[derive(Debug, Clone)]
pub enum TallyScope {
    Session {
        session_code: i64,
    },
    Quiz {
        session_code: i64,
        quiz_id: String,
    },
    Question {
        session_code: i64,
        quiz_id: String,
        question_id: String,
    },
}

/// Read-only access to quiz definitions. Quiz CRUD lives elsewhere; this
/// service only ever resolves answer keys and option text from it.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError>;
}

/// Read-only access to session metadata (owning host, referenced quiz).
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn get_session(&self, session_code: i64) -> Result<Option<LiveSession>, StoreError>;
}

#[async_trait]
pub trait TallyStore: Send + Sync {
    /// Applies one accepted submission to the triple's tally and returns the
    /// post-update snapshot. Implementations must apply the whole increment
    /// sequence atomically per submission: two racing submissions for the
    /// same triple must both land in the final counts.
    async fn apply_submission(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
        selected_option_ids: &BTreeSet<String>,
        is_correct: bool,
    ) -> Result<ResponseTally, StoreError>;

    async fn get(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
    ) -> Result<Option<ResponseTally>, StoreError>;

    async fn list_for_quiz(
        &self,
        session_code: i64,
        quiz_id: &str,
    ) -> Result<Vec<ResponseTally>, StoreError>;

    /// Deletes every tally matching the scope, returning the true count of
    /// removed records.
    async fn delete_scope(&self, scope: &TallyScope) -> Result<u64, StoreError>;
}

/// Outcome of a score insert. `Duplicate` carries the record already stored
/// under the same participant+session key.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    Duplicate(ScoreRecord),
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome, StoreError>;

    async fn find_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoreRecord>, StoreError>;

    async fn find_by_session(&self, session_code: i64) -> Result<Vec<ScoreRecord>, StoreError>;

    async fn find_by_session_and_participant(
        &self,
        session_code: i64,
        participant_id: &str,
    ) -> Result<Option<ScoreRecord>, StoreError>;

    async fn delete_scope(
        &self,
        session_code: i64,
        quiz_id: Option<&str>,
    ) -> Result<u64, StoreError>;
}
