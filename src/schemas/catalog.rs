use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::{format_primitive, parse_datetime_flexible};
use crate::db::models::{Choice, Course, Exam, Question};
use crate::repositories::exams::ExamSummaryRow;
use crate::services::attempts::AttemptAllowance;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_true")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            is_active: course.is_active,
            created_at: format_primitive(course.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "total_marks must be non-negative"))]
    pub(crate) total_marks: i32,
    #[serde(default = "default_true")]
    pub(crate) is_active: bool,
    #[serde(default, deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) starts_at: Option<PrimitiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) ends_at: Option<PrimitiveDateTime>,
    /// Zero means unlimited.
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 0, message = "max_attempts must be non-negative"))]
    pub(crate) max_attempts: i32,
}

impl ExamCreate {
    pub(crate) fn window_is_ordered(&self) -> bool {
        match (self.starts_at, self.ends_at) {
            (Some(starts_at), Some(ends_at)) => starts_at < ends_at,
            _ => true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) is_active: bool,
    pub(crate) starts_at: Option<String>,
    pub(crate) ends_at: Option<String>,
    pub(crate) max_attempts: i32,
    pub(crate) created_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            course_id: exam.course_id,
            title: exam.title,
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            is_active: exam.is_active,
            starts_at: exam.starts_at.map(format_primitive),
            ends_at: exam.ends_at.map(format_primitive),
            max_attempts: exam.max_attempts,
            created_at: format_primitive(exam.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) max_attempts: i32,
    pub(crate) starts_at: Option<String>,
    pub(crate) ends_at: Option<String>,
    pub(crate) question_count: i64,
}

impl ExamSummaryResponse {
    pub(crate) fn from_row(row: ExamSummaryRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            course_title: row.course_title,
            title: row.title,
            duration_minutes: row.duration_minutes,
            total_marks: row.total_marks,
            max_attempts: row.max_attempts,
            starts_at: row.starts_at.map(format_primitive),
            ends_at: row.ends_at.map(format_primitive),
            question_count: row.question_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamSummaryResponse,
    pub(crate) attempts_used: i64,
    /// `null` when the exam allows unlimited attempts.
    pub(crate) attempts_remaining: Option<i64>,
    pub(crate) has_open_attempt: bool,
}

impl ExamDetailResponse {
    pub(crate) fn new(
        row: ExamSummaryRow,
        allowance: AttemptAllowance,
        has_open_attempt: bool,
    ) -> Self {
        Self {
            exam: ExamSummaryResponse::from_row(row),
            attempts_used: allowance.used,
            attempts_remaining: allowance.remaining,
            has_open_attempt,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct ChoiceCreate {
    #[validate(length(min = 1, max = 255, message = "choice text must be 1-255 characters"))]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) is_correct: bool,
    #[serde(default)]
    #[validate(url(message = "image_url must be a valid URL"))]
    pub(crate) image_url: Option<String>,
    #[serde(default)]
    pub(crate) code_snippet: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub(crate) text: String,
    #[validate(length(min = 2, max = 10, message = "a question needs 2-10 choices"), nested)]
    pub(crate) choices: Vec<ChoiceCreate>,
}

impl QuestionCreate {
    pub(crate) fn correct_choice_count(&self) -> usize {
        self.choices.iter().filter(|choice| choice.is_correct).count()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChoiceResponse {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) image_url: Option<String>,
    pub(crate) code_snippet: Option<String>,
}

impl ChoiceResponse {
    pub(crate) fn from_db(choice: Choice) -> Self {
        Self {
            id: choice.id,
            position: choice.position,
            text: choice.text,
            is_correct: choice.is_correct,
            image_url: choice.image_url,
            code_snippet: choice.code_snippet,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) choices: Vec<ChoiceResponse>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            position: question.position,
            text: question.text,
            choices: choices.into_iter().map(ChoiceResponse::from_db).collect(),
        }
    }
}

/// Bulk catalog document: one course, one exam and its questions.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ImportDocument {
    #[validate(length(min = 1, max = 200, message = "course must be 1-200 characters"))]
    pub(crate) course: String,
    #[validate(nested)]
    pub(crate) exam: ImportExam,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ImportExam {
    #[validate(length(min = 1, max = 200, message = "exam title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default = "default_import_duration")]
    #[validate(range(min = 1, message = "duration must be positive"))]
    pub(crate) duration: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "total_marks must be non-negative"))]
    pub(crate) total_marks: i32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<ImportQuestion>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ImportQuestion {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) choices: Vec<ImportChoice>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ImportChoice {
    #[validate(length(min = 1, max = 255, message = "choice text must be 1-255 characters"))]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) course_id: String,
    pub(crate) exam_id: String,
    pub(crate) created_questions: usize,
    pub(crate) skipped_questions: usize,
    pub(crate) created_choices: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> i32 {
    1
}

fn default_import_duration() -> i32 {
    30
}

fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_document_applies_defaults() {
        let document: ImportDocument = serde_json::from_value(json!({
            "course": "Networks",
            "exam": {
                "title": "Midterm",
                "questions": [
                    { "text": "Port for HTTPS?", "choices": [
                        { "text": "443", "is_correct": true },
                        { "text": "80", "is_correct": false }
                    ]}
                ]
            }
        }))
        .expect("valid document");

        assert_eq!(document.exam.duration, 30);
        assert_eq!(document.exam.total_marks, 0);
        assert!(document.validate().is_ok());
    }

    #[test]
    fn question_create_requires_two_choices() {
        let payload: QuestionCreate = serde_json::from_value(json!({
            "text": "Lonely question",
            "choices": [{ "text": "only", "is_correct": true }]
        }))
        .expect("valid json");

        assert!(payload.validate().is_err());
    }

    #[test]
    fn exam_create_reads_naive_window_as_utc() {
        let payload: ExamCreate = serde_json::from_value(json!({
            "course_id": "course-1",
            "title": "Final",
            "duration_minutes": 45,
            "starts_at": "2026-05-01T09:00",
            "ends_at": "2026-05-01T08:00:00Z"
        }))
        .expect("valid json");

        assert_eq!(payload.max_attempts, 1);
        assert!(payload.starts_at.is_some());
        assert!(!payload.window_is_ordered());
    }
}
