use crate::db::models::Course;

const COLUMNS: &str = "id, title, description, is_active, created_at, updated_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateCourse<'_>,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, title, description, is_active, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(executor)
        .await
}

/// Titles are not unique; the oldest course wins so imports stay stable.
pub(crate) async fn find_by_title(
    executor: impl sqlx::PgExecutor<'_>,
    title: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COLUMNS} FROM courses WHERE title = $1 ORDER BY created_at, id LIMIT 1"
    ))
    .bind(title)
    .fetch_optional(executor)
    .await
}
