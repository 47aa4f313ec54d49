use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::attempt::AttemptResponse;
use crate::schemas::catalog::{
    CourseCreate, CourseResponse, ExamCreate, ExamResponse, ImportDocument, ImportResponse,
    QuestionCreate, QuestionResponse,
};
use crate::services::catalog_import;

pub(super) async fn create_course(
    CurrentAdmin(admin): CurrentAdmin,
    state: State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let course_id = Uuid::new_v4().to_string();
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &course_id,
            title: payload.title.trim(),
            description: &payload.description,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(course_id = %course.id, admin_id = %admin.user_id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

pub(super) async fn create_exam(
    CurrentAdmin(admin): CurrentAdmin,
    state: State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if !payload.window_is_ordered() {
        return Err(ApiError::BadRequest("ends_at must be after starts_at".to_string()));
    }

    repositories::courses::find_by_id(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &exam_id,
            course_id: &payload.course_id,
            title: payload.title.trim(),
            duration_minutes: payload.duration_minutes,
            total_marks: payload.total_marks,
            is_active: payload.is_active,
            starts_at: payload.starts_at,
            ends_at: payload.ends_at,
            max_attempts: payload.max_attempts,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    tracing::info!(
        exam_id = %exam.id,
        course_id = %exam.course_id,
        admin_id = %admin.user_id,
        "Exam created"
    );
    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

pub(super) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    state: State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.correct_choice_count() != 1 {
        return Err(ApiError::BadRequest("Exactly one choice must be marked correct".to_string()));
    }

    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let position = repositories::questions::next_position(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute question position"))?;
    let question_id = Uuid::new_v4().to_string();
    let question = repositories::questions::create(
        &mut *tx,
        repositories::questions::CreateQuestion {
            id: &question_id,
            exam_id: &exam.id,
            position,
            text: payload.text.trim(),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    let mut choices = Vec::with_capacity(payload.choices.len());
    for (index, choice) in payload.choices.iter().enumerate() {
        let choice_id = Uuid::new_v4().to_string();
        let created = repositories::choices::create(
            &mut *tx,
            repositories::choices::CreateChoice {
                id: &choice_id,
                question_id: &question.id,
                position: index as i32 + 1,
                text: choice.text.trim(),
                is_correct: choice.is_correct,
                image_url: choice.image_url.as_deref(),
                code_snippet: choice.code_snippet.as_deref(),
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create choice"))?;
        choices.push(created);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, choices))))
}

pub(super) async fn list_exam_attempts(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    state: State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let (skip, limit) = params.normalized();

    repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let attempts = repositories::attempts::list_by_exam(state.db(), &exam_id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;
    let total_count = repositories::attempts::count_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    let items = attempts.into_iter().map(AttemptResponse::from_db).collect();
    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(super) async fn import_catalog(
    CurrentAdmin(admin): CurrentAdmin,
    state: State<AppState>,
    Json(payload): Json<ImportDocument>,
) -> Result<Json<ImportResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let summary = catalog_import::import_document(state.db(), &payload, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to import catalog"))?;

    tracing::info!(exam_id = %summary.exam_id, admin_id = %admin.user_id, "Catalog imported");
    Ok(Json(ImportResponse {
        course_id: summary.course_id,
        exam_id: summary.exam_id,
        created_questions: summary.created_questions,
        skipped_questions: summary.skipped_questions,
        created_choices: summary.created_choices,
    }))
}
