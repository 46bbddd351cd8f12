use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::RESET_OPERATIONS_TOTAL;
use crate::models::reset::{ResetOutcome, ResetRequest};
use crate::services::parse_session_code;
use crate::storage::{ScoreStore, SessionRegistry, TallyScope, TallyStore};

/// Host-scoped bulk deletion across both stores. Ownership is checked before
/// anything is removed; the two deletions are independent bulk operations
/// (no cross-store transaction) and each reports its true count.
pub struct ResetService {
    sessions: Arc<dyn SessionRegistry>,
    tallies: Arc<dyn TallyStore>,
    scores: Arc<dyn ScoreStore>,
}

impl ResetService {
    pub fn new(
        sessions: Arc<dyn SessionRegistry>,
        tallies: Arc<dyn TallyStore>,
        scores: Arc<dyn ScoreStore>,
    ) -> Self {
        Self {
            sessions,
            tallies,
            scores,
        }
    }

    pub async fn reset(
        &self,
        req: &ResetRequest,
        requesting_host_id: &str,
    ) -> Result<ResetOutcome, ApiError> {
        let session_code = parse_session_code(req.session_code())?;

        let session = self
            .sessions
            .get_session(session_code)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Session {} not found", session_code)))?;

        if session.host_id != requesting_host_id {
            return Err(ApiError::forbidden(
                "Only the owning host may reset session data",
            ));
        }

        let tally_scope = match req {
            ResetRequest::Session { .. } => TallyScope::Session { session_code },
            ResetRequest::Quiz { quiz_id, .. } => TallyScope::Quiz {
                session_code,
                quiz_id: quiz_id.clone(),
            },
            ResetRequest::Question {
                quiz_id,
                question_id,
                ..
            } => TallyScope::Question {
                session_code,
                quiz_id: quiz_id.clone(),
                question_id: question_id.clone(),
            },
        };

        let tallies_deleted = self.tallies.delete_scope(&tally_scope).await?;

        // Score records are per quiz attempt, not per question: a
        // question-granular reset leaves the ledger alone.
        let scores_deleted = match req {
            ResetRequest::Session { .. } => self.scores.delete_scope(session_code, None).await?,
            ResetRequest::Quiz { quiz_id, .. } => {
                self.scores.delete_scope(session_code, Some(quiz_id)).await?
            }
            ResetRequest::Question { .. } => 0,
        };

        RESET_OPERATIONS_TOTAL
            .with_label_values(&[req.scope_label()])
            .inc();

        tracing::info!(
            "Reset session {} at {} scope: {} tallies, {} scores removed",
            session_code,
            req.scope_label(),
            tallies_deleted,
            scores_deleted
        );

        Ok(ResetOutcome {
            tallies_deleted,
            scores_deleted,
        })
    }
}
