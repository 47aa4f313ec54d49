use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;

use crate::core::metrics::{ATTEMPTS_REJECTED, ATTEMPTS_STARTED};
use crate::core::security::Identity;
use crate::db::models::ExamAttempt;
use crate::db::types::FinalizeMode;
use crate::repositories;
use crate::services::errors::{ExamError, ExamResult};
use crate::services::expiry::{Enforcement, ExpiryPolicy};
use crate::services::scoring;

/// How many attempts a user has taken and may still take for an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptAllowance {
    pub(crate) used: i64,
    /// `None` when the exam has no attempt limit.
    pub(crate) remaining: Option<i64>,
}

impl AttemptAllowance {
    /// `max_attempts` of zero means unlimited.
    pub(crate) fn for_limit(max_attempts: i32, used: i64) -> Self {
        let remaining = (max_attempts > 0).then(|| (i64::from(max_attempts) - used).max(0));
        Self { used, remaining }
    }
}

pub(crate) async fn allowance(
    pool: &PgPool,
    identity: &Identity,
    exam_id: &str,
    max_attempts: i32,
) -> ExamResult<AttemptAllowance> {
    let used =
        repositories::attempts::count_by_exam_and_user(pool, exam_id, &identity.user_id).await?;
    Ok(AttemptAllowance::for_limit(max_attempts, used))
}

/// Creates the next attempt for the caller.
///
/// Count and insert run under a transaction-scoped advisory lock keyed on
/// (exam, user), so concurrent starts cannot both pass the limit check.
pub(crate) async fn start(
    pool: &PgPool,
    identity: &Identity,
    exam_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<ExamAttempt> {
    let exam = repositories::exams::find_active(pool, exam_id)
        .await?
        .ok_or(ExamError::NotFound("Exam"))?;

    if !exam.is_available_at(now) {
        return Err(ExamError::ExamNotAvailable);
    }

    let mut tx = pool.begin().await?;
    repositories::attempts::acquire_exam_user_lock(&mut *tx, &exam.id, &identity.user_id)
        .await?;

    let used =
        repositories::attempts::count_by_exam_and_user(&mut *tx, &exam.id, &identity.user_id)
            .await?;
    if exam.has_attempt_limit() && used >= i64::from(exam.max_attempts) {
        metrics::counter!(ATTEMPTS_REJECTED).increment(1);
        tracing::info!(
            exam_id = %exam.id,
            user_id = %identity.user_id,
            used,
            max_attempts = exam.max_attempts,
            "Attempt limit reached"
        );
        return Err(ExamError::AttemptLimitExceeded { used, max: exam.max_attempts });
    }

    let attempt_number = i32::try_from(used + 1)
        .map_err(|_| ExamError::AttemptLimitExceeded { used, max: exam.max_attempts })?;
    let attempt_id = Uuid::new_v4().to_string();
    let attempt = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            user_id: &identity.user_id,
            exam_id: &exam.id,
            attempt_number,
            start_time: now,
            end_time: now + Duration::minutes(i64::from(exam.duration_minutes)),
        },
    )
    .await?;
    tx.commit().await?;

    metrics::counter!(ATTEMPTS_STARTED).increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        exam_id = %attempt.exam_id,
        user_id = %attempt.user_id,
        attempt_number,
        "Attempt started"
    );

    Ok(attempt)
}

/// Most recently started open attempt, without checking its deadline.
pub(crate) async fn current(
    pool: &PgPool,
    identity: &Identity,
    exam_id: &str,
) -> ExamResult<Option<ExamAttempt>> {
    repositories::exams::find_by_id(pool, exam_id).await?.ok_or(ExamError::NotFound("Exam"))?;
    let attempt =
        repositories::attempts::find_latest_open(pool, exam_id, &identity.user_id).await?;
    Ok(attempt)
}

/// The caller's open attempt after the deadline check. `None` means there
/// is nothing to resume and the caller should start a new attempt.
pub(crate) async fn resume(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    exam_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<Option<Enforcement>> {
    match current(pool, identity, exam_id).await? {
        Some(attempt) => Ok(Some(policy.enforce(pool, attempt, now).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn load_owned(
    pool: &PgPool,
    identity: &Identity,
    attempt_id: &str,
) -> ExamResult<ExamAttempt> {
    let attempt = repositories::attempts::find_by_id(pool, attempt_id)
        .await?
        .ok_or(ExamError::NotFound("Attempt"))?;

    if !identity.owns(&attempt.user_id) {
        tracing::warn!(
            attempt_id,
            user_id = %identity.user_id,
            owner_id = %attempt.user_id,
            "Attempt accessed by another user"
        );
        return Err(ExamError::OwnershipViolation {
            resource: "Attempt",
            id: attempt_id.to_string(),
        });
    }

    Ok(attempt)
}

/// Status query for one attempt; applies the deadline check first.
pub(crate) async fn status(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<Enforcement> {
    let attempt = load_owned(pool, identity, attempt_id).await?;
    policy.enforce(pool, attempt, now).await
}

/// The caller's attempts for an exam, newest first. Open attempts past their
/// deadline are closed before they are reported.
pub(crate) async fn list_for_user(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    exam_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<Vec<ExamAttempt>> {
    repositories::exams::find_by_id(pool, exam_id).await?.ok_or(ExamError::NotFound("Exam"))?;
    let listed =
        repositories::attempts::list_by_exam_and_user(pool, exam_id, &identity.user_id).await?;

    let mut attempts = Vec::with_capacity(listed.len());
    for attempt in listed {
        let attempt = if attempt.submitted {
            attempt
        } else {
            policy.enforce(pool, attempt, now).await?.into_attempt()
        };
        attempts.push(attempt);
    }
    Ok(attempts)
}

/// Submits the caller's open attempt for an exam.
///
/// An attempt already past its deadline is closed as `auto_deadline`. With
/// no open attempt the latest submitted one is returned unchanged.
pub(crate) async fn submit(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    identity: &Identity,
    exam_id: &str,
    now: PrimitiveDateTime,
) -> ExamResult<ExamAttempt> {
    if let Some(open) = current(pool, identity, exam_id).await? {
        let mode = if policy.is_expired(&open, now) {
            FinalizeMode::AutoDeadline
        } else {
            FinalizeMode::ManualSubmit
        };
        let finalized = scoring::finalize(pool, &open.id, mode, now).await?;
        return Ok(finalized.attempt);
    }

    repositories::attempts::find_latest(pool, exam_id, &identity.user_id)
        .await?
        .filter(|attempt| attempt.submitted)
        .ok_or(ExamError::NotFound("Attempt"))
}
