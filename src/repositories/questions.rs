use sqlx::PgPool;

use crate::db::models::Question;

const COLUMNS: &str = "id, exam_id, position, text, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) position: i32,
    pub(crate) text: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, exam_id, position, text, created_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.position)
    .bind(params.text)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn next_position(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_exam_and_text(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    text: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 AND text = $2 LIMIT 1"
    ))
    .bind(exam_id)
    .bind(text)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY position, created_at, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}
