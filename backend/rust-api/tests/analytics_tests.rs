mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    attempt_body, build_app, get_as_host, host_token, post_json, response_body, HOST_ID,
    OTHER_HOST_ID, QUIZ_ID, SESSION_CODE,
};

fn analytics_uri(session_code: &str) -> String {
    format!("/api/v1/host/sessions/{}/analytics", session_code)
}

async fn record_two_attempts(app: &axum::Router) {
    // p1: both answers correct, p2: one of two.
    post_json(
        app,
        "/api/v1/attempts",
        attempt_body(
            "p1",
            json!([
                { "question_id": "q1", "selected_option_ids": ["o1"] },
                { "question_id": "q2", "selected_option_ids": ["a", "b"] },
            ]),
            2,
        ),
    )
    .await;
    post_json(
        app,
        "/api/v1/attempts",
        attempt_body(
            "p2",
            json!([
                { "question_id": "q1", "selected_option_ids": ["o1"] },
                { "question_id": "q2", "selected_option_ids": ["c"] },
            ]),
            2,
        ),
    )
    .await;
}

#[tokio::test]
async fn analytics_aggregates_the_score_ledger() {
    let app = build_app();
    record_two_attempts(&app).await;

    let (status, body) = get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(HOST_ID)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["session_code"], SESSION_CODE.parse::<i64>().unwrap());
    assert_eq!(body["quiz_id"], QUIZ_ID);
    assert_eq!(body["student_count"], 2);
    assert_eq!(body["total_questions"], 2);
    assert_eq!(body["total_correct"], 3);
    assert_eq!(body["total_possible_answers"], 4);
    assert_eq!(body["average_correct_percent"], 75.0);
}

#[tokio::test]
async fn perfect_scores_land_in_the_top_bucket() {
    let app = build_app();
    record_two_attempts(&app).await;

    let (_, body) = get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(HOST_ID)).await;

    // 100% goes to bucket 9, 50% to bucket 5.
    let buckets = body["score_buckets"].as_array().unwrap();
    assert_eq!(buckets.len(), 10);
    assert_eq!(buckets[9], 1);
    assert_eq!(buckets[5], 1);
    assert_eq!(buckets[0], 0);
}

#[tokio::test]
async fn per_question_breakdown_merges_tallies_with_the_quiz() {
    let app = build_app();

    post_json(&app, "/api/v1/live/responses", response_body("q1", &["o1"])).await;
    post_json(&app, "/api/v1/live/responses", response_body("q1", &["o2"])).await;

    let (_, body) = get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(HOST_ID)).await;

    let per_question = body["per_question"].as_array().unwrap();
    assert_eq!(per_question.len(), 2);

    let q1 = &per_question[0];
    assert_eq!(q1["question_id"], "q1");
    assert_eq!(q1["total_responses"], 2);
    assert_eq!(q1["correct_count"], 1);
    let counts: Vec<i64> = q1["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["count"].as_i64().unwrap())
        .collect();
    assert_eq!(counts, vec![1, 1, 0]);

    // q2 was never answered: present, fully zeroed.
    let q2 = &per_question[1];
    assert_eq!(q2["question_id"], "q2");
    assert_eq!(q2["total_responses"], 0);
    assert!(q2["options"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["count"] == 0));
}

#[tokio::test]
async fn unknown_option_counters_are_surfaced_without_text() {
    let app = build_app();

    post_json(
        &app,
        "/api/v1/live/responses",
        response_body("q1", &["o1", "retired-option"]),
    )
    .await;

    let (_, body) = get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(HOST_ID)).await;

    let options = body["per_question"][0]["options"].as_array().unwrap();
    let stray = options
        .iter()
        .find(|o| o["option_id"] == "retired-option")
        .unwrap();
    assert_eq!(stray["text"], serde_json::Value::Null);
    assert_eq!(stray["is_correct"], false);
    assert_eq!(stray["count"], 1);
}

#[tokio::test]
async fn empty_session_yields_zeroes_not_errors() {
    let app = build_app();

    let (status, body) = get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(HOST_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_count"], 0);
    assert_eq!(body["average_correct_percent"], 0.0);
}

#[tokio::test]
async fn analytics_requires_a_token() {
    let app = build_app();

    let (status, _) = common::get(&app, &analytics_uri(SESSION_CODE)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analytics_is_forbidden_for_non_owning_hosts() {
    let app = build_app();

    let (status, body) =
        get_as_host(&app, &analytics_uri(SESSION_CODE), &host_token(OTHER_HOST_ID)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = build_app();

    let (status, _) = get_as_host(&app, &analytics_uri("999999"), &host_token(HOST_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
