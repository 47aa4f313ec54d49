use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;
use crate::db::types::FinalizeMode;

pub(crate) const COLUMNS: &str = "\
    id, user_id, exam_id, attempt_number, start_time, end_time, submitted, \
    score, submitted_at, finalize_mode, created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
}

/// Serializes attempt creation for one (exam, user) pair until the
/// surrounding transaction ends.
pub(crate) async fn acquire_exam_user_lock(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("exam_attempt:{exam_id}:{user_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn count_by_exam_and_user(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE exam_id = $1 AND user_id = $2")
        .bind(exam_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (
            id, user_id, exam_id, attempt_number, start_time, end_time,
            submitted, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,$5,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.exam_id)
    .bind(params.attempt_number)
    .bind(params.start_time)
    .bind(params.end_time)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_latest_open(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND user_id = $2 AND submitted = FALSE
         ORDER BY start_time DESC, attempt_number DESC
         LIMIT 1"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_latest(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND user_id = $2
         ORDER BY start_time DESC, attempt_number DESC
         LIMIT 1"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_exam_and_user(
    pool: &PgPool,
    exam_id: &str,
    user_id: &str,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND user_id = $2
         ORDER BY attempt_number DESC"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1
         ORDER BY start_time DESC, id
         OFFSET $2 LIMIT $3"
    ))
    .bind(exam_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

/// Exclusive row lock held by finalization.
pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Shared row lock held while an answer is written, so finalization waits
/// for in-flight writes and writes wait for finalization.
pub(crate) async fn lock_for_share(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Returns `None` when the attempt was already submitted.
pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    score: i32,
    mode: FinalizeMode,
    now: PrimitiveDateTime,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts
         SET submitted = TRUE, score = $2, finalize_mode = $3, submitted_at = $4, updated_at = $4
         WHERE id = $1 AND submitted = FALSE
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(score)
    .bind(mode)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Open attempts whose deadline passed before `cutoff`.
pub(crate) async fn list_overdue_open(
    pool: &PgPool,
    cutoff: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE submitted = FALSE AND end_time < $1
         ORDER BY end_time
         LIMIT $2"
    ))
    .bind(cutoff)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
