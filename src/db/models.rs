use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::FinalizeMode;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) is_active: bool,
    pub(crate) starts_at: Option<PrimitiveDateTime>,
    pub(crate) ends_at: Option<PrimitiveDateTime>,
    /// Zero means unlimited.
    pub(crate) max_attempts: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Exam {
    pub(crate) fn has_attempt_limit(&self) -> bool {
        self.max_attempts > 0
    }

    pub(crate) fn is_available_at(&self, now: PrimitiveDateTime) -> bool {
        let opened = self.starts_at.map_or(true, |starts_at| now >= starts_at);
        let not_closed = self.ends_at.map_or(true, |ends_at| now <= ends_at);
        opened && not_closed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Choice {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) image_url: Option<String>,
    pub(crate) code_snippet: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) submitted: bool,
    pub(crate) score: Option<i32>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) finalize_mode: Option<FinalizeMode>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) choice_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
