use serde::Serialize;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::metrics::ATTEMPTS_FINALIZED;
use crate::db::models::ExamAttempt;
use crate::db::types::FinalizeMode;
use crate::repositories;
use crate::services::errors::{ExamError, ExamResult};

#[derive(Debug, Clone)]
pub(crate) struct Finalized {
    pub(crate) attempt: ExamAttempt,
    /// False when another caller had already submitted the attempt.
    pub(crate) transitioned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ScoreSummary {
    pub(crate) score: i32,
    pub(crate) total_questions: i64,
    pub(crate) percentage: f64,
}

/// Counts recorded answers whose selected choice is marked correct.
pub(crate) async fn score(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> ExamResult<i32> {
    let correct = repositories::answers::count_correct(executor, attempt_id).await?;
    Ok(i32::try_from(correct).unwrap_or(i32::MAX))
}

/// Moves an attempt into its terminal state exactly once.
///
/// The attempt row is locked for the whole transaction, so a concurrent
/// submit and deadline check serialize here and only the first computes
/// the score. Later callers get the frozen attempt back unchanged.
pub(crate) async fn finalize(
    pool: &PgPool,
    attempt_id: &str,
    mode: FinalizeMode,
    now: PrimitiveDateTime,
) -> ExamResult<Finalized> {
    let mut tx = pool.begin().await?;

    let locked = repositories::attempts::lock_for_update(&mut *tx, attempt_id)
        .await?
        .ok_or(ExamError::NotFound("Attempt"))?;

    if locked.submitted {
        tx.commit().await?;
        return Ok(Finalized { attempt: locked, transitioned: false });
    }

    let score = score(&mut *tx, &locked.id).await?;
    let attempt =
        repositories::attempts::mark_submitted(&mut *tx, &locked.id, score, mode, now)
            .await?
            .ok_or_else(|| ExamError::AttemptClosed(locked.id.clone()))?;
    tx.commit().await?;

    metrics::counter!(ATTEMPTS_FINALIZED, "mode" => mode.as_str()).increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        exam_id = %attempt.exam_id,
        user_id = %attempt.user_id,
        score,
        mode = mode.as_str(),
        "Attempt finalized"
    );

    Ok(Finalized { attempt, transitioned: true })
}

pub(crate) fn percentage(score: i32, total_questions: i64) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    100.0 * f64::from(score) / total_questions as f64
}

/// Score figures for display. Open attempts report a score of zero.
pub(crate) async fn summarize(pool: &PgPool, attempt: &ExamAttempt) -> ExamResult<ScoreSummary> {
    let total_questions = repositories::exams::count_questions(pool, &attempt.exam_id).await?;
    let score = attempt.score.unwrap_or(0);
    Ok(ScoreSummary { score, total_questions, percentage: percentage(score, total_questions) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_half_correct() {
        assert_eq!(percentage(1, 2), 50.0);
    }

    #[test]
    fn percentage_without_questions_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn percentage_of_full_marks() {
        assert_eq!(percentage(7, 7), 100.0);
    }
}
