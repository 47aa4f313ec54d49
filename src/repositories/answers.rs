use sqlx::PgPool;

use crate::db::models::Answer;

const COLUMNS: &str = "id, attempt_id, question_id, choice_id, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) choice_id: &'a str,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Inserts the answer or replaces the choice of the existing one.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (id, attempt_id, question_id, choice_id, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT (attempt_id, question_id)
         DO UPDATE SET choice_id = EXCLUDED.choice_id, updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.choice_id)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY created_at, id"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

/// Number of answers in the attempt whose chosen choice is correct.
pub(crate) async fn count_correct(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM answers a
         JOIN choices c ON c.id = a.choice_id
         WHERE a.attempt_id = $1 AND c.is_correct",
    )
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}
