use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Database, IndexModel,
};

use super::{
    InsertOutcome, QuizStore, ScoreStore, SessionRegistry, StoreError, TallyScope, TallyStore,
};
use crate::metrics::track_db_operation;
use crate::models::{score::ScoreRecord, tally::ResponseTally, LiveSession, Quiz};

const QUIZZES: &str = "quizzes";
const SESSIONS: &str = "live_sessions";
const TALLIES: &str = "response_tallies";
const SCORES: &str = "score_records";

const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) =
        &*err.kind
    {
        return we.code == DUPLICATE_KEY_CODE;
    }
    false
}

/// Runs `op`, repeating it exactly once if the first error satisfies the
/// predicate. Used for the upsert insert race: when two writers race to
/// create the same document, the loser gets a duplicate-key error, its
/// update definitively did not apply, and a single rerun lands as a plain
/// update on the now-existing document.
async fn retry_once_on<T, E, R, F, Fut>(should_retry: R, mut op: F) -> Result<T, E>
where
    R: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    match op().await {
        Err(err) if should_retry(&err) => op().await,
        other => other,
    }
}

/// Creates the secondary indexes the scoped scans and deletes rely on. The
/// `_id` fields already cover the natural composite keys.
pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    let tally_index = IndexModel::builder()
        .keys(doc! { "session_code": 1, "quiz_id": 1, "question_id": 1 })
        .build();
    db.collection::<ResponseTally>(TALLIES)
        .create_index(tally_index)
        .await?;

    let score_session_index = IndexModel::builder()
        .keys(doc! { "session_code": 1, "quiz_id": 1 })
        .build();
    db.collection::<ScoreRecord>(SCORES)
        .create_index(score_session_index)
        .await?;

    let score_participant_index = IndexModel::builder()
        .keys(doc! { "participant_id": 1 })
        .build();
    db.collection::<ScoreRecord>(SCORES)
        .create_index(score_participant_index)
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}

pub struct MongoQuizStore {
    db: Database,
}

impl MongoQuizStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuizStore for MongoQuizStore {
    async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        let collection = self.db.collection::<Quiz>(QUIZZES);
        track_db_operation("find_one", QUIZZES, async {
            collection
                .find_one(doc! { "_id": quiz_id })
                .await
                .map_err(StoreError::from)
        })
        .await
    }
}

pub struct MongoSessionRegistry {
    db: Database,
}

impl MongoSessionRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRegistry for MongoSessionRegistry {
    async fn get_session(&self, session_code: i64) -> Result<Option<LiveSession>, StoreError> {
        let collection = self.db.collection::<LiveSession>(SESSIONS);
        track_db_operation("find_one", SESSIONS, async {
            collection
                .find_one(doc! { "_id": session_code })
                .await
                .map_err(StoreError::from)
        })
        .await
    }
}

pub struct MongoTallyStore {
    db: Database,
}

impl MongoTallyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn scope_filter(scope: &TallyScope) -> Document {
        match scope {
            TallyScope::Session { session_code } => doc! { "session_code": session_code },
            TallyScope::Quiz {
                session_code,
                quiz_id,
            } => doc! { "session_code": session_code, "quiz_id": quiz_id },
            TallyScope::Question {
                session_code,
                quiz_id,
                question_id,
            } => doc! {
                "session_code": session_code,
                "quiz_id": quiz_id,
                "question_id": question_id,
            },
        }
    }
}

#[async_trait]
impl TallyStore for MongoTallyStore {
    async fn apply_submission(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
        selected_option_ids: &BTreeSet<String>,
        is_correct: bool,
    ) -> Result<ResponseTally, StoreError> {
        let collection = self.db.collection::<ResponseTally>(TALLIES);
        let id = ResponseTally::storage_id(session_code, quiz_id, question_id);

        // One atomic upsert per submission: the server applies every $inc in
        // a single document update, so racing submissions cannot lose counts.
        let mut inc = doc! { "total_responses": 1_i64 };
        if is_correct {
            inc.insert("correct_count", 1_i64);
        }
        for option_id in selected_option_ids {
            inc.insert(format!("option_counts.{}", option_id), 1_i64);
        }

        let update = doc! {
            "$inc": inc,
            "$set": { "updated_at": Utc::now().to_rfc3339() },
            "$setOnInsert": {
                "session_code": session_code,
                "quiz_id": quiz_id,
                "question_id": question_id,
            },
        };

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let updated = track_db_operation("find_one_and_update", TALLIES, async {
            let coll = &collection;
            let filter = doc! { "_id": &id };
            retry_once_on(is_duplicate_key, || {
                let filter = filter.clone();
                let update = update.clone();
                let options = options.clone();
                async move {
                    coll.find_one_and_update(filter, update)
                        .with_options(options)
                        .await
                }
            })
            .await
            .map_err(StoreError::from)
        })
        .await?;

        updated.ok_or_else(|| {
            StoreError::Unavailable(format!("upsert for tally {} returned no document", id))
        })
    }

    async fn get(
        &self,
        session_code: i64,
        quiz_id: &str,
        question_id: &str,
    ) -> Result<Option<ResponseTally>, StoreError> {
        let collection = self.db.collection::<ResponseTally>(TALLIES);
        let id = ResponseTally::storage_id(session_code, quiz_id, question_id);
        track_db_operation("find_one", TALLIES, async {
            collection
                .find_one(doc! { "_id": id })
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_for_quiz(
        &self,
        session_code: i64,
        quiz_id: &str,
    ) -> Result<Vec<ResponseTally>, StoreError> {
        let collection = self.db.collection::<ResponseTally>(TALLIES);
        track_db_operation("find", TALLIES, async {
            let cursor = collection
                .find(doc! { "session_code": session_code, "quiz_id": quiz_id })
                .await?;
            cursor.try_collect().await.map_err(StoreError::from)
        })
        .await
    }

    async fn delete_scope(&self, scope: &TallyScope) -> Result<u64, StoreError> {
        let collection = self.db.collection::<ResponseTally>(TALLIES);
        let filter = Self::scope_filter(scope);
        let result = track_db_operation("delete_many", TALLIES, async {
            collection
                .delete_many(filter)
                .await
                .map_err(StoreError::from)
        })
        .await?;
        Ok(result.deleted_count)
    }
}

pub struct MongoScoreStore {
    db: Database,
}

impl MongoScoreStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScoreStore for MongoScoreStore {
    async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome, StoreError> {
        let collection = self.db.collection::<ScoreRecord>(SCORES);

        let insert_result = track_db_operation("insert_one", SCORES, async {
            collection.insert_one(record).await
        })
        .await;

        match insert_result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_duplicate_key(&err) => {
                let existing = collection
                    .find_one(doc! { "_id": &record.id })
                    .await?
                    .ok_or_else(|| {
                        StoreError::Unavailable(format!(
                            "score record {} vanished during duplicate lookup",
                            record.id
                        ))
                    })?;
                Ok(InsertOutcome::Duplicate(existing))
            }
            Err(err) => Err(StoreError::from(err)),
        }
    }

    async fn find_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let collection = self.db.collection::<ScoreRecord>(SCORES);
        track_db_operation("find", SCORES, async {
            let cursor = collection
                .find(doc! { "participant_id": participant_id })
                .await?;
            cursor.try_collect().await.map_err(StoreError::from)
        })
        .await
    }

    async fn find_by_session(&self, session_code: i64) -> Result<Vec<ScoreRecord>, StoreError> {
        let collection = self.db.collection::<ScoreRecord>(SCORES);
        track_db_operation("find", SCORES, async {
            let cursor = collection
                .find(doc! { "session_code": session_code })
                .await?;
            cursor.try_collect().await.map_err(StoreError::from)
        })
        .await
    }

    async fn find_by_session_and_participant(
        &self,
        session_code: i64,
        participant_id: &str,
    ) -> Result<Option<ScoreRecord>, StoreError> {
        let collection = self.db.collection::<ScoreRecord>(SCORES);
        track_db_operation("find_one", SCORES, async {
            collection
                .find_one(doc! { "session_code": session_code, "participant_id": participant_id })
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_scope(
        &self,
        session_code: i64,
        quiz_id: Option<&str>,
    ) -> Result<u64, StoreError> {
        let collection = self.db.collection::<ScoreRecord>(SCORES);
        let mut filter = doc! { "session_code": session_code };
        if let Some(quiz_id) = quiz_id {
            filter.insert("quiz_id", quiz_id);
        }
        let result = track_db_operation("delete_many", SCORES, async {
            collection
                .delete_many(filter)
                .await
                .map_err(StoreError::from)
        })
        .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::retry_once_on;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        InsertRaceLost,
        Down,
    }

    fn lost_insert_race(err: &FakeError) -> bool {
        matches!(err, FakeError::InsertRaceLost)
    }

    #[tokio::test]
    async fn losing_the_insert_race_is_retried_once() {
        let calls = AtomicUsize::new(0);

        let res = retry_once_on(lost_insert_race, || async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(FakeError::InsertRaceLost),
                n => Ok(n),
            }
        })
        .await;

        assert_eq!(res.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_fail_without_a_retry() {
        let calls = AtomicUsize::new(0);

        let res: Result<(), _> = retry_once_on(lost_insert_race, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::Down)
        })
        .await;

        assert_eq!(res.unwrap_err(), FakeError::Down);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_second_failure_is_surfaced() {
        let res: Result<(), _> = retry_once_on(lost_insert_race, || async {
            Err(FakeError::InsertRaceLost)
        })
        .await;

        assert_eq!(res.unwrap_err(), FakeError::InsertRaceLost);
    }
}
