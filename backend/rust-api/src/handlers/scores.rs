use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::score::{RecordAttemptRequest, ScoreRecord},
    services::{score_service::ScoreService, AppState},
};

pub(crate) async fn record_attempt(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RecordAttemptRequest>,
) -> Result<(StatusCode, Json<ScoreRecord>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::invalid_argument(e.to_string()))?;

    let service = ScoreService::new(state.quizzes.clone(), state.scores.clone());
    let recorded = service.record_attempt(&payload).await?;

    let status = if recorded.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(recorded.record)))
}

pub(crate) async fn get_by_participant(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
) -> Result<Json<Vec<ScoreRecord>>, ApiError> {
    let service = ScoreService::new(state.quizzes.clone(), state.scores.clone());
    let records = service.get_by_participant(&participant_id).await?;
    Ok(Json(records))
}

pub(crate) async fn get_by_session(
    State(state): State<Arc<AppState>>,
    Path(session_code): Path<String>,
) -> Result<Json<Vec<ScoreRecord>>, ApiError> {
    let service = ScoreService::new(state.quizzes.clone(), state.scores.clone());
    let records = service.get_by_session(&session_code).await?;
    Ok(Json(records))
}

pub(crate) async fn get_by_session_and_participant(
    State(state): State<Arc<AppState>>,
    Path((session_code, participant_id)): Path<(String, String)>,
) -> Result<Json<ScoreRecord>, ApiError> {
    let service = ScoreService::new(state.quizzes.clone(), state.scores.clone());
    let record = service
        .get_by_session_and_participant(&session_code, &participant_id)
        .await?;
    Ok(Json(record))
}
