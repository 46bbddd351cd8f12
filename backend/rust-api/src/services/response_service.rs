use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::RESPONSES_RECORDED_TOTAL;
use crate::models::tally::{ResponseTally, SubmitResponseRequest, SubmitResponseResponse};
use crate::services::answer_key::AnswerKeyResolver;
use crate::services::parse_session_code;
use crate::storage::{QuizStore, TallyStore};
use crate::utils::retry::{retry_reads, RetryConfig};

/// Live-play submission pipeline: validate, grade against the answer key,
/// then apply one atomic increment to the triple's tally.
pub struct ResponseService {
    resolver: AnswerKeyResolver,
    tallies: Arc<dyn TallyStore>,
}

impl ResponseService {
    pub fn new(quizzes: Arc<dyn QuizStore>, tallies: Arc<dyn TallyStore>) -> Self {
        Self {
            resolver: AnswerKeyResolver::new(quizzes),
            tallies,
        }
    }

    pub async fn submit(
        &self,
        req: &SubmitResponseRequest,
    ) -> Result<SubmitResponseResponse, ApiError> {
        let session_code = parse_session_code(&req.session_code)?;

        if req.selected_option_ids.is_empty() {
            return Err(ApiError::invalid_argument(
                "selected_option_ids must not be empty",
            ));
        }
        for option_id in &req.selected_option_ids {
            validate_option_id(option_id)?;
        }

        let key = self.resolver.resolve(&req.quiz_id, &req.question_id).await?;

        // Unrecognized ids still count (option churn tolerance) but are
        // anomalies worth surfacing.
        for option_id in &req.selected_option_ids {
            if !key.knows_option(option_id) {
                tracing::warn!(
                    "Submission for quiz {} question {} selected unknown option id {:?}",
                    req.quiz_id,
                    req.question_id,
                    option_id
                );
            }
        }

        let is_correct = key.grades_correct(&req.selected_option_ids);

        let tally = self
            .tallies
            .apply_submission(
                session_code,
                &req.quiz_id,
                &req.question_id,
                &req.selected_option_ids,
                is_correct,
            )
            .await?;

        RESPONSES_RECORDED_TOTAL
            .with_label_values(&[if is_correct { "true" } else { "false" }])
            .inc();

        tracing::info!(
            "Recorded response: session={}, quiz={}, question={}, correct={}, total={}",
            session_code,
            req.quiz_id,
            req.question_id,
            is_correct,
            tally.total_responses
        );

        Ok(SubmitResponseResponse { is_correct, tally })
    }

    pub async fn get_tally(
        &self,
        session_code_raw: &str,
        quiz_id: &str,
        question_id: &str,
    ) -> Result<ResponseTally, ApiError> {
        let session_code = parse_session_code(session_code_raw)?;

        let tally = retry_reads(RetryConfig::default(), || async {
            self.tallies.get(session_code, quiz_id, question_id).await
        })
        .await?;

        tally.ok_or_else(|| {
            ApiError::not_found(format!(
                "No responses recorded for session {} quiz {} question {}",
                session_code, quiz_id, question_id
            ))
        })
    }
}

/// Option ids become field names inside the tally's counter document, so
/// they must be valid MongoDB keys.
fn validate_option_id(option_id: &str) -> Result<(), ApiError> {
    if option_id.is_empty() {
        return Err(ApiError::invalid_argument("option ids must not be empty"));
    }
    if option_id.contains('.') || option_id.starts_with('$') {
        return Err(ApiError::invalid_argument(format!(
            "option id {:?} contains characters not allowed in counter keys",
            option_id
        )));
    }
    Ok(())
}
