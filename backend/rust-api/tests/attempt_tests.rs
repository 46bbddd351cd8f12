mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{attempt_body, build_app, get, post_json, SESSION_CODE};

fn two_answers(first: &[&str], second: &[&str]) -> serde_json::Value {
    json!([
        { "question_id": "q1", "selected_option_ids": first },
        { "question_id": "q2", "selected_option_ids": second },
    ])
}

#[tokio::test]
async fn attempt_is_graded_against_the_answer_key() {
    let app = build_app();

    // q1 correct, q2 wrong (subset of {a, b}).
    let body = attempt_body("p1", two_answers(&["o1"], &["a"]), 2);
    let (status, record) = post_json(&app, "/api/v1/attempts", body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["correct_answers"], 1);
    assert_eq!(record["total_questions"], 2);
    assert_eq!(record["score_percentage"], 50.0);
    assert_eq!(record["answers"][0]["is_correct"], true);
    assert_eq!(record["answers"][1]["is_correct"], false);
}

#[tokio::test]
async fn score_percentage_spans_the_full_range() {
    let app = build_app();

    let (_, zero) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p-zero", two_answers(&["o2"], &["c"]), 2),
    )
    .await;
    assert_eq!(zero["correct_answers"], 0);
    assert_eq!(zero["score_percentage"], 0.0);

    let (_, full) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p-full", two_answers(&["o1"], &["a", "b"]), 2),
    )
    .await;
    assert_eq!(full["correct_answers"], 2);
    assert_eq!(full["score_percentage"], 100.0);
}

#[tokio::test]
async fn declared_count_is_reconciled_against_the_quiz() {
    let app = build_app();

    // Client claims 5 questions; the quiz has 2 and that is what the
    // percentage is computed against.
    let (status, record) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p1", json!([{ "question_id": "q1", "selected_option_ids": ["o1"] }]), 5),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["total_questions"], 2);
    assert_eq!(record["score_percentage"], 50.0);
}

#[tokio::test]
async fn identical_retry_replays_the_stored_record() {
    let app = build_app();

    let body = attempt_body("p1", two_answers(&["o1"], &["a", "b"]), 2);
    let (status, first) = post_json(&app, "/api/v1/attempts", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = post_json(&app, "/api/v1/attempts", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["_id"], first["_id"]);
    assert_eq!(second["score_percentage"], first["score_percentage"]);
}

#[tokio::test]
async fn divergent_retry_is_a_conflict() {
    let app = build_app();

    let (status, _) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p1", two_answers(&["o1"], &["a", "b"]), 2),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p1", two_answers(&["o2"], &["c"]), 2),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn zero_declared_questions_is_rejected() {
    let app = build_app();

    let (status, body) = post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p1", json!([]), 0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
}

#[tokio::test]
async fn more_answers_than_questions_is_rejected() {
    let app = build_app();

    let answers = json!([
        { "question_id": "q1", "selected_option_ids": ["o1"] },
        { "question_id": "q2", "selected_option_ids": ["a"] },
        { "question_id": "q1", "selected_option_ids": ["o2"] },
    ]);
    let (status, _) = post_json(&app, "/api/v1/attempts", attempt_body("p1", answers, 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeating_a_question_cannot_inflate_the_score() {
    let app = build_app();

    // Answering q1 correctly twice must not score as two correct answers.
    let answers = json!([
        { "question_id": "q1", "selected_option_ids": ["o1"] },
        { "question_id": "q1", "selected_option_ids": ["o1"] },
    ]);
    let (status, body) = post_json(&app, "/api/v1/attempts", attempt_body("p1", answers, 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    // Nothing was recorded for the participant.
    let uri = format!("/api/v1/scores/session/{}/participant/p1", SESSION_CODE);
    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_quiz_is_not_found() {
    let app = build_app();

    let mut body = attempt_body("p1", json!([]), 2);
    body["quiz_id"] = json!("no-such-quiz");
    let (status, response) = post_json(&app, "/api/v1/attempts", body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}

#[tokio::test]
async fn missing_participant_id_is_rejected() {
    let app = build_app();

    let mut body = attempt_body("p1", json!([]), 2);
    body["participant_id"] = json!("");
    let (status, _) = post_json(&app, "/api/v1/attempts", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn score_reads_return_recorded_attempts() {
    let app = build_app();

    post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p1", two_answers(&["o1"], &["a", "b"]), 2),
    )
    .await;
    post_json(
        &app,
        "/api/v1/attempts",
        attempt_body("p2", two_answers(&["o2"], &["c"]), 2),
    )
    .await;

    let (status, records) = get(&app, "/api/v1/scores/participant/p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["participant_id"], "p1");

    let uri = format!("/api/v1/scores/session/{}", SESSION_CODE);
    let (status, records) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/scores/session/{}/participant/p2", SESSION_CODE);
    let (status, record) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["participant_id"], "p2");
    assert_eq!(record["score_percentage"], 0.0);

    let uri = format!("/api/v1/scores/session/{}/participant/nobody", SESSION_CODE);
    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
