use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics::{ANSWERS_RECORDED, SUSPICIOUS_REQUESTS};
use crate::core::security::Identity;
use crate::db::models::{Answer, ExamAttempt};
use crate::repositories;
use crate::services::attempts;
use crate::services::errors::{ExamError, ExamResult};
use crate::services::expiry::{Enforcement, ExpiryPolicy};

/// Saves the caller's choice for one question, replacing any earlier choice.
///
/// The deadline check runs first, so a write arriving after expiry closes
/// the attempt and fails with `AttemptClosed`.
pub(crate) async fn record(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    attempt_id: &str,
    question_id: &str,
    choice_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<Answer> {
    let attempt = attempts::load_owned(pool, identity, attempt_id).await?;
    let attempt = match policy.enforce(pool, attempt, now).await? {
        Enforcement::StillOpen { attempt, .. } => attempt,
        Enforcement::ForciblyClosed(attempt) | Enforcement::AlreadyClosed(attempt) => {
            return Err(ExamError::AttemptClosed(attempt.id));
        }
    };

    let question = repositories::questions::find_by_id(pool, question_id)
        .await?
        .ok_or(ExamError::NotFound("Question"))?;
    if question.exam_id != attempt.exam_id {
        return Err(suspicious(
            &attempt,
            question_id,
            choice_id,
            "Question does not belong to this exam",
        ));
    }

    let choice = repositories::choices::find_by_id(pool, choice_id)
        .await?
        .ok_or(ExamError::NotFound("Choice"))?;
    if choice.question_id != question.id {
        return Err(suspicious(
            &attempt,
            question_id,
            choice_id,
            "Choice does not belong to this question",
        ));
    }

    let mut tx = pool.begin().await?;
    let locked = repositories::attempts::lock_for_share(&mut *tx, &attempt.id)
        .await?
        .ok_or(ExamError::NotFound("Attempt"))?;
    if locked.submitted {
        return Err(ExamError::AttemptClosed(locked.id));
    }

    let answer_id = Uuid::new_v4().to_string();
    let answer = repositories::answers::upsert(
        &mut *tx,
        repositories::answers::UpsertAnswer {
            id: &answer_id,
            attempt_id: &attempt.id,
            question_id: &question.id,
            choice_id: &choice.id,
            now,
        },
    )
    .await?;
    tx.commit().await?;

    metrics::counter!(ANSWERS_RECORDED).increment(1);
    tracing::debug!(
        attempt_id = %attempt.id,
        question_id = %question.id,
        choice_id = %choice.id,
        "Answer recorded"
    );

    Ok(answer)
}

fn suspicious(
    attempt: &ExamAttempt,
    question_id: &str,
    choice_id: &str,
    reason: &'static str,
) -> ExamError {
    metrics::counter!(SUSPICIOUS_REQUESTS).increment(1);
    tracing::warn!(
        attempt_id = %attempt.id,
        exam_id = %attempt.exam_id,
        user_id = %attempt.user_id,
        question_id,
        choice_id,
        reason,
        "Rejected answer referencing foreign question or choice"
    );
    ExamError::InvalidChoice(reason)
}
