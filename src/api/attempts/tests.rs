use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::security::Identity;
use crate::core::time::primitive_now_utc;
use crate::services::attempts;
use crate::test_support::{self, ExamParams};

#[tokio::test]
async fn answer_can_be_changed_until_submit() {
    let ctx = test_support::setup_test_context().await;

    let course = test_support::insert_course(ctx.state.db(), "Geometry").await;
    let exam = test_support::insert_exam(ctx.state.db(), &course, ExamParams::default()).await;
    let (question, choices) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Sum of triangle angles?",
        &[("180", true), ("360", false)],
    )
    .await;
    let attempt = attempts::start(
        ctx.state.db(),
        &Identity::user("student-1"),
        &exam.id,
        primitive_now_utc(),
    )
    .await
    .expect("start");
    let token = test_support::bearer_token("student-1", ctx.state.settings());
    let uri = format!("/api/v1/attempts/{}/answers", attempt.id);

    for choice in [&choices[1], &choices[0]] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "question_id": question.id, "choice_id": choice.id })),
            ))
            .await
            .expect("record answer");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["choice_id"], choice.id.as_str());
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{}", attempt.id),
            Some(&token),
            None,
        ))
        .await
        .expect("attempt status");
    let status_body = test_support::read_json(response).await;
    assert_eq!(status_body["is_open"], true);
    assert!(status_body["remaining_seconds"].as_i64().expect("remaining") > 0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{}/submit", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "question_id": question.id, "choice_id": choices[1].id })),
        ))
        .await
        .expect("late answer");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn foreign_attempt_looks_missing() {
    let ctx = test_support::setup_test_context().await;

    let course = test_support::insert_course(ctx.state.db(), "Geometry").await;
    let exam = test_support::insert_exam(ctx.state.db(), &course, ExamParams::default()).await;
    let (question, choices) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Right angle?",
        &[("90", true), ("45", false)],
    )
    .await;
    let attempt = attempts::start(
        ctx.state.db(),
        &Identity::user("owner"),
        &exam.id,
        primitive_now_utc(),
    )
    .await
    .expect("start");
    let intruder = test_support::bearer_token("intruder", ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{}", attempt.id),
            Some(&intruder),
            None,
        ))
        .await
        .expect("foreign status");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{}/answers", attempt.id),
            Some(&intruder),
            Some(json!({ "question_id": question.id, "choice_id": choices[0].id })),
        ))
        .await
        .expect("foreign answer");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn choice_from_another_question_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let course = test_support::insert_course(ctx.state.db(), "Geometry").await;
    let exam = test_support::insert_exam(ctx.state.db(), &course, ExamParams::default()).await;
    let (first, _) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Sides of a square?",
        &[("4", true), ("3", false)],
    )
    .await;
    let (_, other_choices) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Sides of a triangle?",
        &[("3", true), ("4", false)],
    )
    .await;
    let attempt = attempts::start(
        ctx.state.db(),
        &Identity::user("student-1"),
        &exam.id,
        primitive_now_utc(),
    )
    .await
    .expect("start");
    let token = test_support::bearer_token("student-1", ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{}/answers", attempt.id),
            Some(&token),
            Some(json!({ "question_id": first.id, "choice_id": other_choices[0].id })),
        ))
        .await
        .expect("cross answer");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{}/answers", attempt.id),
            Some(&token),
            Some(json!({ "question_id": "", "choice_id": other_choices[0].id })),
        ))
        .await
        .expect("empty question id");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn results_are_available_only_after_submit() {
    let ctx = test_support::setup_test_context().await;

    let course = test_support::insert_course(ctx.state.db(), "Geometry").await;
    let exam = test_support::insert_exam(ctx.state.db(), &course, ExamParams::default()).await;
    let (first, first_choices) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Degrees in a circle?",
        &[("360", true), ("180", false)],
    )
    .await;
    let (second, _) = test_support::insert_question_with_choices(
        ctx.state.db(),
        &exam,
        "Pi to two places?",
        &[("3.14", true), ("3.41", false)],
    )
    .await;
    let attempt = attempts::start(
        ctx.state.db(),
        &Identity::user("student-1"),
        &exam.id,
        primitive_now_utc(),
    )
    .await
    .expect("start");
    let token = test_support::bearer_token("student-1", ctx.state.settings());
    let results_uri = format!("/api/v1/attempts/{}/results", attempt.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{}/answers", attempt.id),
            Some(&token),
            Some(json!({ "question_id": first.id, "choice_id": first_choices[0].id })),
        ))
        .await
        .expect("answer");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &results_uri, Some(&token), None))
        .await
        .expect("results while open");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{}/submit", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, &results_uri, Some(&token), None))
        .await
        .expect("results");
    let status = response.status();
    let results = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {results}");
    assert_eq!(results["score"], 1);
    assert_eq!(results["total_questions"], 2);
    assert_eq!(results["percentage"], 50.0);

    let rows = results["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["question_id"], first.id.as_str());
    assert_eq!(rows[0]["is_correct"], true);
    assert_eq!(rows[0]["selected_choice"]["id"], first_choices[0].id.as_str());
    assert_eq!(rows[1]["question_id"], second.id.as_str());
    assert!(rows[1]["selected_choice"].is_null());
    assert_eq!(rows[1]["correct_choice"]["text"], "3.14");
    assert_eq!(rows[1]["is_correct"], false);
}
