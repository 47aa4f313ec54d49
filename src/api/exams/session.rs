use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamAttempt;
use crate::repositories;
use crate::schemas::attempt::{
    AttemptResponse, AttemptStateResponse, QuestionView, ScoredAttemptResponse,
};
use crate::services::expiry::Enforcement;
use crate::services::{attempts, scoring};

pub(in crate::api::exams) async fn start_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    let attempt = attempts::start(state.db(), &identity, &exam_id, primitive_now_utc()).await?;
    Ok((StatusCode::CREATED, Json(AttemptResponse::from_db(attempt))))
}

pub(in crate::api::exams) async fn list_my_attempts(
    Path(exam_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let attempts = attempts::list_for_user(
        state.db(),
        state.expiry(),
        &identity,
        &exam_id,
        primitive_now_utc(),
    )
    .await?;
    Ok(Json(attempts.into_iter().map(AttemptResponse::from_db).collect()))
}

/// Resume entry point. Closes the attempt instead when its time is up.
pub(in crate::api::exams) async fn current_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let enforcement =
        attempts::resume(state.db(), state.expiry(), &identity, &exam_id, primitive_now_utc())
            .await?
            .ok_or_else(|| ApiError::NotFound("No open attempt".to_string()))?;

    match enforcement {
        Enforcement::StillOpen { attempt, remaining_seconds } => {
            let questions = question_views(&state, &attempt).await?;
            Ok(Json(AttemptStateResponse::Open {
                attempt: AttemptResponse::from_db(attempt),
                questions,
                remaining_seconds,
            }))
        }
        Enforcement::ForciblyClosed(attempt) | Enforcement::AlreadyClosed(attempt) => {
            Ok(Json(AttemptStateResponse::Closed { attempt: AttemptResponse::from_db(attempt) }))
        }
    }
}

pub(in crate::api::exams) async fn submit_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ScoredAttemptResponse>, ApiError> {
    let attempt =
        attempts::submit(state.db(), state.expiry(), &identity, &exam_id, primitive_now_utc())
            .await?;
    let summary = scoring::summarize(state.db(), &attempt).await?;
    Ok(Json(ScoredAttemptResponse::new(attempt, summary)))
}

async fn question_views(
    state: &AppState,
    attempt: &ExamAttempt,
) -> Result<Vec<QuestionView>, ApiError> {
    let questions = repositories::questions::list_by_exam(state.db(), &attempt.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let choices = repositories::choices::list_by_exam(state.db(), &attempt.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load choices"))?;
    let answers = repositories::answers::list_by_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    Ok(QuestionView::build(questions, choices, answers))
}
