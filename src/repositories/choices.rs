use sqlx::PgPool;

use crate::db::models::Choice;

const COLUMNS: &str =
    "id, question_id, position, text, is_correct, image_url, code_snippet, created_at";

pub(crate) struct CreateChoice<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) position: i32,
    pub(crate) text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) image_url: Option<&'a str>,
    pub(crate) code_snippet: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateChoice<'_>,
) -> Result<Choice, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "INSERT INTO choices (
            id, question_id, position, text, is_correct, image_url, code_snippet, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.position)
    .bind(params.text)
    .bind(params.is_correct)
    .bind(params.image_url)
    .bind(params.code_snippet)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!("SELECT {COLUMNS} FROM choices WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Choices for every question of an exam, ordered for display.
pub(crate) async fn list_by_exam(pool: &PgPool, exam_id: &str) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        "SELECT c.id, c.question_id, c.position, c.text, c.is_correct, c.image_url, \
                c.code_snippet, c.created_at \
         FROM choices c \
         JOIN questions q ON q.id = c.question_id \
         WHERE q.exam_id = $1 \
         ORDER BY q.position, q.created_at, q.id, c.position, c.created_at, c.id",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}
