use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    InsertOutcome, QuizStore, ScoreStore, SessionRegistry, StoreError, TallyScope, TallyStore,
};
use crate::models::{score::ScoreRecord, tally::ResponseTally, LiveSession, Quiz};

/// In-memory quiz store. Used by the integration tests and the `memory`
/// storage backend for local runs; seeded through `insert`.
#[derive(Default)]
pub struct MemoryQuizStore {
    quizzes: Mutex<HashMap<String, Quiz>>,
}

impl MemoryQuizStore {
    pub fn insert(&self, quiz: Quiz) {
        self.quizzes
            .lock()
            .expect("quiz store lock poisoned")
            .insert(quiz.id.clone(), quiz);
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        let quizzes = self.quizzes.lock().expect("quiz store lock poisoned");
        Ok(quizzes.get(quiz_id).cloned())
    }
}

#[derive(Default)]
pub struct MemorySessionRegistry {
    sessions: Mutex<HashMap<i64, LiveSession>>,
}

impl MemorySessionRegistry {
    pub fn insert(&self, session: LiveSession) {
        self.sessions
            .lock()
            .expect("session registry lock poisoned")
            .insert(session.code, session);
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn get_session(&self, session_code: i64) -> Result<Option<LiveSession>, StoreError> {
        let sessions = self.sessions.lock().expect("session registry lock poisoned");
        Ok(sessions.get(&session_code).cloned())
    }
}

/// In-memory tally store. The whole read-modify-write for a submission runs
/// under one lock, which gives the same no-lost-update guarantee the MongoDB
/// backend gets from its atomic `$inc` upsert.
#[derive(Default)]
pub struct MemoryTallyStore {
    tallies: Mutex<HashMap<String, ResponseTally>>,
}

#[async_trait]
impl TallyStore for MemoryTallyStore {
    async fn apply_submission(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
        selected_option_ids: &BTreeSet<String>,
        is_correct: bool,
    ) -> Result<ResponseTally, StoreError> {
        let id = ResponseTally::storage_id(session_code, quiz_id, question_id);
        let mut tallies = self.tallies.lock().expect("tally store lock poisoned");
        let tally = tallies
            .entry(id)
            .or_insert_with(|| ResponseTally::empty(session_code, quiz_id, question_id));

        tally.total_responses += 1;
        if is_correct {
            tally.correct_count += 1;
        }
        for option_id in selected_option_ids {
            *tally.option_counts.entry(option_id.clone()).or_insert(0) += 1;
        }
        tally.updated_at = Utc::now();

        Ok(tally.clone())
    }

    async fn get(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
    ) -> Result<Option<ResponseTally>, StoreError> {
        let id = ResponseTally::storage_id(session_code, quiz_id, question_id);
        let tallies = self.tallies.lock().expect("tally store lock poisoned");
        Ok(tallies.get(&id).cloned())
    }

    async fn list_for_quiz(
        &self,
        session_code: i64,
        quiz_id: &str,
    ) -> Result<Vec<ResponseTally>, StoreError> {
        let tallies = self.tallies.lock().expect("tally store lock poisoned");
        Ok(tallies
            .values()
            .filter(|t| t.session_code == session_code && t.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn delete_scope(&self, scope: &TallyScope) -> Result<u64, StoreError> {
        let mut tallies = self.tallies.lock().expect("tally store lock poisoned");
        let before = tallies.len();
        tallies.retain(|_, t| !scope_matches(scope, t));
        Ok((before - tallies.len()) as u64)
    }
}

fn scope_matches(scope: &TallyScope, tally: &ResponseTally) -> bool {
    match scope {
        TallyScope::Session { session_code } => tally.session_code == *session_code,
        TallyScope::Quiz {
            session_code,
            quiz_id,
        } => tally.session_code == *session_code && tally.quiz_id == *quiz_id,
        TallyScope::Question {
            session_code,
            quiz_id,
            question_id,
        } => {
            tally.session_code == *session_code
                && tally.quiz_id == *quiz_id
                && tally.question_id == *question_id
        }
    }
}

#[derive(Default)]
pub struct MemoryScoreStore {
    records: Mutex<HashMap<String, ScoreRecord>>,
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome, StoreError> {
        let mut records = self.records.lock().expect("score store lock poisoned");
        if let Some(existing) = records.get(&record.id) {
            return Ok(InsertOutcome::Duplicate(existing.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let records = self.records.lock().expect("score store lock poisoned");
        Ok(records
            .values()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect())
    }

    async fn find_by_session(&self, session_code: i64) -> Result<Vec<ScoreRecord>, StoreError> {
        let records = self.records.lock().expect("score store lock poisoned");
        Ok(records
            .values()
            .filter(|r| r.session_code == session_code)
            .cloned()
            .collect())
    }

    async fn find_by_session_and_participant(
        &self,
        session_code: i64,
        participant_id: &str,
    ) -> Result<Option<ScoreRecord>, StoreError> {
        let records = self.records.lock().expect("score store lock poisoned");
        Ok(records
            .values()
            .find(|r| r.session_code == session_code && r.participant_id == participant_id)
            .cloned())
    }

    async fn delete_scope(
        &self,
        session_code: i64,
        quiz_id: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.lock().expect("score store lock poisoned");
        let before = records.len();
        records.retain(|_, r| {
            let in_scope = r.session_code == session_code
                && quiz_id.map_or(true, |quiz_id| r.quiz_id == quiz_id);
            !in_scope
        });
        Ok((before - records.len()) as u64)
    }
}
