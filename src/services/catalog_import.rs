use std::path::Path;

use anyhow::{anyhow, Context};
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::repositories;
use crate::schemas::catalog::ImportDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) course_id: String,
    pub(crate) exam_id: String,
    pub(crate) created_questions: usize,
    pub(crate) skipped_questions: usize,
    pub(crate) created_choices: usize,
}

pub(crate) async fn import_file(
    pool: &PgPool,
    path: &Path,
    now: PrimitiveDateTime,
) -> anyhow::Result<ImportSummary> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
    let document: ImportDocument =
        serde_json::from_str(&raw).context("catalog file has invalid format")?;
    document.validate().map_err(|e| anyhow!("catalog file is invalid: {e}"))?;

    import_document(pool, &document, now).await
}

/// Loads one course/exam document in a single transaction.
///
/// Course and exam are matched by title. A question whose text already
/// exists in the exam is skipped together with its choices.
pub(crate) async fn import_document(
    pool: &PgPool,
    document: &ImportDocument,
    now: PrimitiveDateTime,
) -> anyhow::Result<ImportSummary> {
    let course_title = document.course.trim();
    let exam_title = document.exam.title.trim();
    if course_title.is_empty() {
        return Err(anyhow!("course title is empty"));
    }
    if exam_title.is_empty() {
        return Err(anyhow!("exam title is empty"));
    }

    let mut tx = pool.begin().await.context("failed to begin import transaction")?;

    let course = match repositories::courses::find_by_title(&mut *tx, course_title)
        .await
        .context("failed to look up course")?
    {
        Some(course) => course,
        None => {
            let course_id = Uuid::new_v4().to_string();
            repositories::courses::create(
                &mut *tx,
                repositories::courses::CreateCourse {
                    id: &course_id,
                    title: course_title,
                    description: "",
                    is_active: true,
                    created_at: now,
                },
            )
            .await
            .with_context(|| format!("failed to create course {course_title}"))?
        }
    };

    let exam = match repositories::exams::find_by_course_and_title(&mut *tx, &course.id, exam_title)
        .await
        .context("failed to look up exam")?
    {
        Some(exam) => exam,
        None => {
            let exam_id = Uuid::new_v4().to_string();
            repositories::exams::create(
                &mut *tx,
                repositories::exams::CreateExam {
                    id: &exam_id,
                    course_id: &course.id,
                    title: exam_title,
                    duration_minutes: document.exam.duration,
                    total_marks: document.exam.total_marks,
                    is_active: true,
                    starts_at: None,
                    ends_at: None,
                    max_attempts: 1,
                    created_at: now,
                },
            )
            .await
            .with_context(|| format!("failed to create exam {exam_title}"))?
        }
    };

    let mut created_questions = 0usize;
    let mut skipped_questions = 0usize;
    let mut created_choices = 0usize;

    for raw_question in &document.exam.questions {
        let text = raw_question.text.trim();
        if text.is_empty() {
            return Err(anyhow!("question text is empty in exam {exam_title}"));
        }

        let existing = repositories::questions::find_by_exam_and_text(&mut *tx, &exam.id, text)
            .await
            .context("failed to look up question")?;
        if existing.is_some() {
            tracing::warn!(
                exam_id = %exam.id,
                question = %preview(text),
                "Skipped existing question"
            );
            skipped_questions += 1;
            continue;
        }

        let position = repositories::questions::next_position(&mut *tx, &exam.id)
            .await
            .context("failed to compute question position")?;
        let question_id = Uuid::new_v4().to_string();
        let question = repositories::questions::create(
            &mut *tx,
            repositories::questions::CreateQuestion {
                id: &question_id,
                exam_id: &exam.id,
                position,
                text,
                created_at: now,
            },
        )
        .await
        .with_context(|| format!("failed to create question {}", preview(text)))?;

        for (index, raw_choice) in raw_question.choices.iter().enumerate() {
            let choice_id = Uuid::new_v4().to_string();
            repositories::choices::create(
                &mut *tx,
                repositories::choices::CreateChoice {
                    id: &choice_id,
                    question_id: &question.id,
                    position: index as i32 + 1,
                    text: raw_choice.text.trim(),
                    is_correct: raw_choice.is_correct,
                    image_url: None,
                    code_snippet: None,
                    created_at: now,
                },
            )
            .await
            .with_context(|| format!("failed to create choice for {}", preview(text)))?;
            created_choices += 1;
        }

        tracing::info!(exam_id = %exam.id, question = %preview(text), "Added question");
        created_questions += 1;
    }

    tx.commit().await.context("failed to commit import transaction")?;

    metrics::counter!("catalog_import_questions_total").increment(created_questions as u64);
    tracing::info!(
        course_id = %course.id,
        exam_id = %exam.id,
        created_questions,
        skipped_questions,
        created_choices,
        "Catalog import completed"
    );

    Ok(ImportSummary {
        course_id: course.id,
        exam_id: exam.id,
        created_questions,
        skipped_questions,
        created_choices,
    })
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "й".repeat(80);
        assert_eq!(preview(&text).chars().count(), 50);
        assert_eq!(preview("short"), "short");
    }
}
