use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::security::Identity;
use crate::db::models::{Answer, Choice, ExamAttempt, Question};
use crate::repositories;
use crate::services::attempts;
use crate::services::errors::{ExamError, ExamResult};
use crate::services::expiry::{Enforcement, ExpiryPolicy};
use crate::services::scoring::{self, ScoreSummary};

/// One question of a finished attempt, for display.
#[derive(Debug, Clone)]
pub(crate) struct ResultRow {
    pub(crate) question: Question,
    pub(crate) selected: Option<Choice>,
    /// First correct choice by position; `None` if the question has none.
    pub(crate) correct: Option<Choice>,
}

impl ResultRow {
    pub(crate) fn is_correct(&self) -> bool {
        self.selected.as_ref().is_some_and(|choice| choice.is_correct)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptResults {
    pub(crate) attempt: ExamAttempt,
    pub(crate) summary: ScoreSummary,
    pub(crate) rows: Vec<ResultRow>,
}

/// Builds rows in question order. `choices` must already be ordered by
/// position within each question.
pub(crate) fn assemble(
    questions: Vec<Question>,
    choices: Vec<Choice>,
    answers: &[Answer],
) -> Vec<ResultRow> {
    let mut choices_by_question: HashMap<String, Vec<Choice>> = HashMap::new();
    for choice in choices {
        choices_by_question.entry(choice.question_id.clone()).or_default().push(choice);
    }

    let selected_by_question: HashMap<&str, &str> = answers
        .iter()
        .map(|answer| (answer.question_id.as_str(), answer.choice_id.as_str()))
        .collect();

    questions
        .into_iter()
        .map(|question| {
            let options = choices_by_question.remove(&question.id).unwrap_or_default();
            let selected = selected_by_question.get(question.id.as_str()).and_then(|choice_id| {
                options.iter().find(|choice| choice.id == *choice_id).cloned()
            });
            let correct = options.into_iter().find(|choice| choice.is_correct);
            ResultRow { question, selected, correct }
        })
        .collect()
}

pub(crate) async fn rows(pool: &PgPool, attempt: &ExamAttempt) -> ExamResult<Vec<ResultRow>> {
    let questions = repositories::questions::list_by_exam(pool, &attempt.exam_id).await?;
    let choices = repositories::choices::list_by_exam(pool, &attempt.exam_id).await?;
    let answers = repositories::answers::list_by_attempt(pool, &attempt.id).await?;
    Ok(assemble(questions, choices, &answers))
}

/// Results for the caller's attempt. The deadline check runs first; an
/// attempt that is still open has no results yet.
pub(crate) async fn for_attempt(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<AttemptResults> {
    let attempt = attempts::load_owned(pool, identity, attempt_id).await?;
    let attempt = match policy.enforce(pool, attempt, now).await? {
        Enforcement::StillOpen { attempt, .. } => {
            return Err(ExamError::AttemptInProgress(attempt.id));
        }
        Enforcement::ForciblyClosed(attempt) | Enforcement::AlreadyClosed(attempt) => attempt,
    };

    let summary = scoring::summarize(pool, &attempt).await?;
    let rows = rows(pool, &attempt).await?;
    Ok(AttemptResults { attempt, summary, rows })
}
