use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::tally::{ResponseTally, SubmitResponseRequest, SubmitResponseResponse},
    services::{response_service::ResponseService, AppState},
};

pub(crate) async fn submit_response(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<SubmitResponseRequest>,
) -> Result<Json<SubmitResponseResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::invalid_argument(e.to_string()))?;

    let service = ResponseService::new(state.quizzes.clone(), state.tallies.clone());
    let response = service.submit(&payload).await?;
    Ok(Json(response))
}

pub(crate) async fn get_tally(
    State(state): State<Arc<AppState>>,
    Path((session_code, quiz_id, question_id)): Path<(String, String, String)>,
) -> Result<Json<ResponseTally>, ApiError> {
    let service = ResponseService::new(state.quizzes.clone(), state.tallies.clone());
    let tally = service
        .get_tally(&session_code, &quiz_id, &question_id)
        .await?;
    Ok(Json(tally))
}
