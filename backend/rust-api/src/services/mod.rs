use std::sync::Arc;

use mongodb::Database;

use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use crate::storage::{
    memory::{MemoryQuizStore, MemoryScoreStore, MemorySessionRegistry, MemoryTallyStore},
    mongo::{self, MongoQuizStore, MongoScoreStore, MongoSessionRegistry, MongoTallyStore},
    QuizStore, ScoreStore, SessionRegistry, TallyStore,
};

pub struct AppState {
    pub config: Config,
    pub quizzes: Arc<dyn QuizStore>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub tallies: Arc<dyn TallyStore>,
    pub scores: Arc<dyn ScoreStore>,
    /// Present only when the MongoDB backend is active; used by /health.
    pub mongo: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        match config.storage_backend {
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let db = client.database(&config.mongo_database);
                mongo::ensure_indexes(&db)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to ensure indexes: {}", e))?;
                tracing::info!("MongoDB storage backend initialized");

                Ok(Self {
                    config,
                    quizzes: Arc::new(MongoQuizStore::new(db.clone())),
                    sessions: Arc::new(MongoSessionRegistry::new(db.clone())),
                    tallies: Arc::new(MongoTallyStore::new(db.clone())),
                    scores: Arc::new(MongoScoreStore::new(db.clone())),
                    mongo: Some(db),
                })
            }
            StorageBackend::Memory => {
                tracing::info!("In-memory storage backend initialized");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryQuizStore::default()),
            Arc::new(MemorySessionRegistry::default()),
            Arc::new(MemoryTallyStore::default()),
            Arc::new(MemoryScoreStore::default()),
        )
    }

    /// Explicit store injection; the test suites seed the memory stores and
    /// hand them in through here.
    pub fn with_stores(
        config: Config,
        quizzes: Arc<dyn QuizStore>,
        sessions: Arc<dyn SessionRegistry>,
        tallies: Arc<dyn TallyStore>,
        scores: Arc<dyn ScoreStore>,
    ) -> Self {
        Self {
            config,
            quizzes,
            sessions,
            tallies,
            scores,
            mongo: None,
        }
    }
}

/// Session codes travel as strings on the wire but must be numeric.
pub(crate) fn parse_session_code(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse::<i64>().map_err(|_| {
        ApiError::invalid_argument(format!("session_code must be numeric, got {:?}", raw))
    })
}

pub mod analytics_service;
pub mod answer_key;
pub mod reset_service;
pub mod response_service;
pub mod score_service;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_code_parses_integers_only() {
        assert_eq!(parse_session_code("100200").unwrap(), 100200);
        assert_eq!(parse_session_code(" 42 ").unwrap(), 42);
        assert!(parse_session_code("abc").is_err());
        assert!(parse_session_code("12.5").is_err());
        assert!(parse_session_code("").is_err());
    }
}
