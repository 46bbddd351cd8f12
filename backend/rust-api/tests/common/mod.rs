#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use livequiz_api::{
    config::{Config, StorageBackend},
    create_router,
    middlewares::auth::{HostClaims, JwtService},
    models::{LiveSession, Question, QuestionOption, Quiz},
    services::AppState,
    storage::memory::{MemoryQuizStore, MemoryScoreStore, MemorySessionRegistry, MemoryTallyStore},
};

pub const HOST_ID: &str = "host-1";
pub const OTHER_HOST_ID: &str = "host-2";
pub const SESSION_CODE: &str = "100200";
pub const OTHER_SESSION_CODE: &str = "300400";
pub const QUIZ_ID: &str = "quiz-capitals";
pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        mongo_uri: "mongodb://unused:27017".to_string(),
        mongo_database: "unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

fn option(id: &str, text: &str, is_correct: bool) -> QuestionOption {
    QuestionOption {
        id: id.to_string(),
        text: text.to_string(),
        is_correct,
        points: None,
    }
}

/// Quiz fixture: q1 has one correct option, q2 has two (multi-answer).
pub fn seed_quiz() -> Quiz {
    Quiz {
        id: QUIZ_ID.to_string(),
        title: "Capitals of the world".to_string(),
        questions: vec![
            Question {
                id: "q1".to_string(),
                text: "Capital of France?".to_string(),
                options: vec![
                    option("o1", "Paris", true),
                    option("o2", "Lyon", false),
                    option("o3", "Marseille", false),
                ],
            },
            Question {
                id: "q2".to_string(),
                text: "Which of these are capitals?".to_string(),
                options: vec![
                    option("a", "Madrid", true),
                    option("b", "Lisbon", true),
                    option("c", "Porto", false),
                ],
            },
        ],
    }
}

/// Builds the real router over seeded in-memory stores.
pub fn build_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let quizzes = Arc::new(MemoryQuizStore::default());
    let sessions = Arc::new(MemorySessionRegistry::default());

    quizzes.insert(seed_quiz());
    sessions.insert(LiveSession {
        code: SESSION_CODE.parse().unwrap(),
        host_id: HOST_ID.to_string(),
        quiz_id: QUIZ_ID.to_string(),
        is_active: true,
        created_at: Utc::now(),
    });
    sessions.insert(LiveSession {
        code: OTHER_SESSION_CODE.parse().unwrap(),
        host_id: OTHER_HOST_ID.to_string(),
        quiz_id: QUIZ_ID.to_string(),
        is_active: true,
        created_at: Utc::now(),
    });

    let state = AppState::with_stores(
        test_config(),
        quizzes,
        sessions,
        Arc::new(MemoryTallyStore::default()),
        Arc::new(MemoryScoreStore::default()),
    );

    create_router(Arc::new(state))
}

pub fn host_token(host_id: &str) -> String {
    let claims = HostClaims {
        sub: host_id.to_string(),
        role: "host".to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        iat: Utc::now().timestamp() as usize,
    };
    JwtService::new(JWT_SECRET)
        .generate_token(claims)
        .expect("token generation failed")
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json_as_host(
    app: &Router,
    uri: &str,
    body: Value,
    token: &str,
) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

pub async fn get_as_host(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, Some(token)).await
}

/// Shorthand for the live submission body.
pub fn response_body(question_id: &str, selected: &[&str]) -> Value {
    json!({
        "session_code": SESSION_CODE,
        "quiz_id": QUIZ_ID,
        "question_id": question_id,
        "selected_option_ids": selected,
    })
}

/// Shorthand for a full attempt body.
pub fn attempt_body(participant_id: &str, answers: Value, declared_total: u32) -> Value {
    json!({
        "participant_id": participant_id,
        "participant_display_name": format!("Participant {}", participant_id),
        "session_code": SESSION_CODE,
        "quiz_id": QUIZ_ID,
        "answers": answers,
        "declared_total_questions": declared_total,
    })
}
