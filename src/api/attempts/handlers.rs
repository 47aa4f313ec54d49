use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    AnswerCreate, AnswerResponse, AttemptResponse, AttemptStatusResponse, ResultsResponse,
};
use crate::services::expiry::Enforcement;
use crate::services::{answers, attempts, results};

pub(super) async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptStatusResponse>, ApiError> {
    let enforcement =
        attempts::status(state.db(), state.expiry(), &identity, &attempt_id, primitive_now_utc())
            .await?;

    let is_open = enforcement.is_open();
    let remaining_seconds = match &enforcement {
        Enforcement::StillOpen { remaining_seconds, .. } => *remaining_seconds,
        Enforcement::ForciblyClosed(_) | Enforcement::AlreadyClosed(_) => 0,
    };

    Ok(Json(AttemptStatusResponse {
        attempt: AttemptResponse::from_db(enforcement.into_attempt()),
        is_open,
        remaining_seconds,
    }))
}

pub(super) async fn record_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<AnswerCreate>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let answer = answers::record(
        state.db(),
        state.expiry(),
        &identity,
        &attempt_id,
        &payload.question_id,
        &payload.choice_id,
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(AnswerResponse::from_db(answer)))
}

pub(super) async fn get_results(
    Path(attempt_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let results = results::for_attempt(
        state.db(),
        state.expiry(),
        &identity,
        &attempt_id,
        primitive_now_utc(),
    )
    .await?;
    Ok(Json(ResultsResponse::from_results(results)))
}
