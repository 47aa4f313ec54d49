use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::catalog::{ExamDetailResponse, ExamSummaryResponse};
use crate::services::attempts;

pub(in crate::api::exams) async fn list_exams(
    CurrentUser(_identity): CurrentUser,
    state: State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let (skip, limit) = params.normalized();

    let rows = repositories::exams::list_active_summaries(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    let items = rows.into_iter().map(ExamSummaryResponse::from_row).collect();
    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(identity): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let row = repositories::exams::find_active_summary(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let allowance =
        attempts::allowance(state.db(), &identity, &row.id, row.max_attempts).await?;
    let has_open_attempt =
        attempts::resume(state.db(), state.expiry(), &identity, &row.id, primitive_now_utc())
            .await?
            .is_some_and(|enforcement| enforcement.is_open());

    Ok(Json(ExamDetailResponse::new(row, allowance, has_open_attempt)))
}
