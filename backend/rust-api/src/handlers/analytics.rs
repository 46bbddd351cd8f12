use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::HostClaims,
    models::{
        analytics::SessionAnalytics,
        reset::{ResetOutcome, ResetRequest},
    },
    services::{
        analytics_service::AnalyticsService, parse_session_code, reset_service::ResetService,
        AppState,
    },
};

pub(crate) async fn session_analytics(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<HostClaims>,
    Path(session_code): Path<String>,
) -> Result<Json<SessionAnalytics>, ApiError> {
    let session_code = parse_session_code(&session_code)?;

    let service = AnalyticsService::new(
        state.quizzes.clone(),
        state.sessions.clone(),
        state.tallies.clone(),
        state.scores.clone(),
    );
    let analytics = service.session_analytics(session_code, &claims.sub).await?;
    Ok(Json(analytics))
}

pub(crate) async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<HostClaims>,
    AppJson(payload): AppJson<ResetRequest>,
) -> Result<Json<ResetOutcome>, ApiError> {
    let service = ResetService::new(
        state.sessions.clone(),
        state.tallies.clone(),
        state.scores.clone(),
    );
    let outcome = service.reset(&payload, &claims.sub).await?;
    Ok(Json(outcome))
}
