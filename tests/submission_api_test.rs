mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{app, app_with, send, token_for, Reply, CORRECT};
use quiz_backend::services::quiz_service::QuizSettings;
use serde_json::{json, Value as JsonValue};

async fn create_quiz(router: &axum::Router, token: Option<&str>) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/quizzes",
        Some(json!({"topic": "Geology", "model": "gpt-4o-mini"})),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["quiz"]["id"].as_str().unwrap().to_string()
}

fn flags(result: &JsonValue) -> Vec<bool> {
    result["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["is_correct"].as_bool().unwrap())
        .collect()
}

#[tokio::test]
async fn submission_is_scored_and_can_be_read_back() {
    let t = app(Reply::Questions(5));
    let quiz_id = create_quiz(&t.router, None).await;

    let answers = json!({"answers": ["A", "B", "C", "D", "B"]});
    let (status, result) = send(
        &t.router,
        "POST",
        &format!("/api/quizzes/{}/submit", quiz_id),
        Some(answers),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["score"], 4);
    assert_eq!(result["total"], 5);
    assert_eq!(result["percentage"], 80);
    assert_eq!(flags(&result), vec![true, true, true, true, false]);
    assert_eq!(result["results"][4]["correct_answer"], CORRECT[4]);
    assert_eq!(result["results"][4]["explanation"], "Fact 5 explained.");
    assert!(result["feedback"].as_str().unwrap().starts_with("Great job"));

    let submission_id = result["submission_id"].as_str().unwrap();
    let (status, read_back) = send(
        &t.router,
        "GET",
        &format!("/api/submissions/{}", submission_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read_back, result);

    assert_eq!(t.store.submission_count().await, 1);
    assert_eq!(t.store.user_answer_count().await, 5);
}

#[tokio::test]
async fn malformed_answers_are_rejected() {
    let t = app(Reply::Questions(5));
    let uri = format!("/api/quizzes/{}/submit", create_quiz(&t.router, None).await);

    for answers in [
        json!({"answers": ["A", "B", "C", "D"]}),
        json!({"answers": ["A", "B", "C", "D", "E"]}),
        json!({"answers": ["A", "B", "C", "D", "AB"]}),
        json!({"answers": []}),
    ] {
        let (status, _) = send(&t.router, "POST", &uri, Some(answers), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(t.store.submission_count().await, 0);
}

#[tokio::test]
async fn expired_quiz_returns_gone_and_writes_nothing() {
    let t = app_with(
        Reply::Questions(5),
        QuizSettings {
            quiz_lifetime: Duration::seconds(-1),
            ..QuizSettings::default()
        },
    );
    let quiz_id = create_quiz(&t.router, None).await;

    let (status, body) = send(
        &t.router,
        "POST",
        &format!("/api/quizzes/{}/submit", quiz_id),
        Some(json!({"answers": ["A", "B", "C", "D", "A"]})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "quiz_expired");
    assert!(body["message"].as_str().unwrap().contains("no longer valid"));
    assert_eq!(t.store.submission_count().await, 0);
    assert_eq!(t.store.user_answer_count().await, 0);
}

#[tokio::test]
async fn submissions_are_bound_to_the_quiz_owner() {
    let t = app(Reply::Questions(5));
    let alice = token_for("alice");
    let bob = token_for("bob");
    let quiz_id = create_quiz(&t.router, Some(&alice)).await;
    let uri = format!("/api/quizzes/{}/submit", quiz_id);
    let answers = json!({"answers": ["A", "B", "C", "D", "A"]});

    let (status, _) = send(&t.router, "POST", &uri, Some(answers.clone()), Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, result) = send(&t.router, "POST", &uri, Some(answers), Some(&alice)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["percentage"], 100);

    let read_uri = format!("/api/submissions/{}", result["submission_id"].as_str().unwrap());
    let (status, _) = send(&t.router, "GET", &read_uri, None, Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&t.router, "GET", &read_uri, None, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_quiz_and_submission_are_not_found() {
    let t = app(Reply::Questions(5));
    let (status, _) = send(
        &t.router,
        "POST",
        &format!("/api/quizzes/{}/submit", uuid::Uuid::new_v4()),
        Some(json!({"answers": ["A", "B", "C", "D", "A"]})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.router,
        "GET",
        &format!("/api/submissions/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
