use time::PrimitiveDateTime;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str = "\
    id, course_id, title, duration_minutes, total_marks, is_active, \
    starts_at, ends_at, max_attempts, created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) is_active: bool,
    pub(crate) starts_at: Option<PrimitiveDateTime>,
    pub(crate) ends_at: Option<PrimitiveDateTime>,
    pub(crate) max_attempts: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Catalog listing row: an exam with its course title and question count.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamSummaryRow {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) max_attempts: i32,
    pub(crate) starts_at: Option<PrimitiveDateTime>,
    pub(crate) ends_at: Option<PrimitiveDateTime>,
    pub(crate) question_count: i64,
}

const SUMMARY_SELECT: &str = "\
    SELECT e.id, e.course_id, c.title AS course_title, e.title, e.duration_minutes, \
           e.total_marks, e.max_attempts, e.starts_at, e.ends_at, \
           (SELECT COUNT(*) FROM questions q WHERE q.exam_id = e.id) AS question_count \
    FROM exams e \
    JOIN courses c ON c.id = e.course_id";

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, course_id, title, duration_minutes, total_marks, is_active,
            starts_at, ends_at, max_attempts, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.is_active)
    .bind(params.starts_at)
    .bind(params.ends_at)
    .bind(params.max_attempts)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// An exam counts as active only when its course is active too.
pub(crate) async fn find_active(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE id = $1
           AND is_active = TRUE
           AND EXISTS (SELECT 1 FROM courses c WHERE c.id = exams.course_id AND c.is_active)"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_course_and_title(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    title: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE course_id = $1 AND title = $2
         ORDER BY created_at, id
         LIMIT 1"
    ))
    .bind(course_id)
    .bind(title)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_active_summaries(
    executor: impl sqlx::PgExecutor<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSummaryRow>(&format!(
        "{SUMMARY_SELECT}
         WHERE e.is_active AND c.is_active
         ORDER BY c.title, e.title, e.id
         OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_active(executor: impl sqlx::PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM exams e JOIN courses c ON c.id = e.course_id
         WHERE e.is_active AND c.is_active",
    )
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_active_summary(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSummaryRow>(&format!(
        "{SUMMARY_SELECT}
         WHERE e.id = $1 AND e.is_active AND c.is_active"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_questions(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}
