use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Choice, ExamAttempt, Question};
use crate::db::types::FinalizeMode;
use crate::services::results::{AttemptResults, ResultRow};
use crate::services::scoring::ScoreSummary;

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) submitted: bool,
    pub(crate) score: Option<i32>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) finalize_mode: Option<FinalizeMode>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            user_id: attempt.user_id,
            attempt_number: attempt.attempt_number,
            start_time: format_primitive(attempt.start_time),
            end_time: format_primitive(attempt.end_time),
            submitted: attempt.submitted,
            score: attempt.score,
            submitted_at: attempt.submitted_at.map(format_primitive),
            finalize_mode: attempt.finalize_mode,
        }
    }
}

/// A choice as shown while the attempt is running; correctness is hidden.
#[derive(Debug, Serialize)]
pub(crate) struct ChoiceView {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) code_snippet: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) choices: Vec<ChoiceView>,
    pub(crate) selected_choice_id: Option<String>,
}

impl QuestionView {
    pub(crate) fn build(
        questions: Vec<Question>,
        choices: Vec<Choice>,
        answers: Vec<Answer>,
    ) -> Vec<Self> {
        let mut choices_by_question: HashMap<String, Vec<ChoiceView>> = HashMap::new();
        for choice in choices {
            choices_by_question.entry(choice.question_id).or_default().push(ChoiceView {
                id: choice.id,
                position: choice.position,
                text: choice.text,
                image_url: choice.image_url,
                code_snippet: choice.code_snippet,
            });
        }
        let mut selected: HashMap<String, String> =
            answers.into_iter().map(|answer| (answer.question_id, answer.choice_id)).collect();

        questions
            .into_iter()
            .map(|question| Self {
                choices: choices_by_question.remove(&question.id).unwrap_or_default(),
                selected_choice_id: selected.remove(&question.id),
                id: question.id,
                position: question.position,
                text: question.text,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum AttemptStateResponse {
    Open { attempt: AttemptResponse, questions: Vec<QuestionView>, remaining_seconds: i64 },
    Closed { attempt: AttemptResponse },
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStatusResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) is_open: bool,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerCreate {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[validate(length(min = 1, message = "choice_id must not be empty"))]
    pub(crate) choice_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) choice_id: String,
    pub(crate) updated_at: String,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: Answer) -> Self {
        Self {
            id: answer.id,
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            choice_id: answer.choice_id,
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoredAttemptResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) score: i32,
    pub(crate) total_questions: i64,
    pub(crate) percentage: f64,
}

impl ScoredAttemptResponse {
    pub(crate) fn new(attempt: ExamAttempt, summary: ScoreSummary) -> Self {
        Self {
            attempt: AttemptResponse::from_db(attempt),
            score: summary.score,
            total_questions: summary.total_questions,
            percentage: summary.percentage,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultChoice {
    pub(crate) id: String,
    pub(crate) text: String,
}

impl ResultChoice {
    fn from_db(choice: Choice) -> Self {
        Self { id: choice.id, text: choice.text }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultRowResponse {
    pub(crate) question_id: String,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) selected_choice: Option<ResultChoice>,
    pub(crate) correct_choice: Option<ResultChoice>,
    pub(crate) is_correct: bool,
}

impl ResultRowResponse {
    fn from_row(row: ResultRow) -> Self {
        let is_correct = row.is_correct();
        Self {
            question_id: row.question.id,
            position: row.question.position,
            question_text: row.question.text,
            selected_choice: row.selected.map(ResultChoice::from_db),
            correct_choice: row.correct.map(ResultChoice::from_db),
            is_correct,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultsResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) score: i32,
    pub(crate) total_questions: i64,
    pub(crate) percentage: f64,
    pub(crate) rows: Vec<ResultRowResponse>,
}

impl ResultsResponse {
    pub(crate) fn from_results(results: AttemptResults) -> Self {
        Self {
            attempt: AttemptResponse::from_db(results.attempt),
            score: results.summary.score,
            total_questions: results.summary.total_questions,
            percentage: results.summary.percentage,
            rows: results.rows.into_iter().map(ResultRowResponse::from_row).collect(),
        }
    }
}
