use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};

use crate::core::config::Settings;
use crate::db::models::ExamAttempt;
use crate::db::types::FinalizeMode;
use crate::services::errors::ExamResult;
use crate::services::scoring;

pub(crate) const DEFAULT_GRACE_SECONDS: i64 = 5;

/// Result of checking an attempt against its deadline.
#[derive(Debug, Clone)]
pub(crate) enum Enforcement {
    StillOpen { attempt: ExamAttempt, remaining_seconds: i64 },
    /// The deadline had passed and this check submitted the attempt.
    ForciblyClosed(ExamAttempt),
    AlreadyClosed(ExamAttempt),
}

impl Enforcement {
    pub(crate) fn into_attempt(self) -> ExamAttempt {
        match self {
            Self::StillOpen { attempt, .. } => attempt,
            Self::ForciblyClosed(attempt) | Self::AlreadyClosed(attempt) => attempt,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        matches!(self, Self::StillOpen { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ExpiryPolicy {
    grace: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_GRACE_SECONDS))
    }
}

impl ExpiryPolicy {
    pub(crate) fn new(grace: Duration) -> Self {
        Self { grace: grace.max(Duration::ZERO) }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(Duration::seconds(settings.exam().expiry_grace_seconds))
    }

    pub(crate) fn grace(&self) -> Duration {
        self.grace
    }

    /// True once `now` is strictly more than the grace period past `end_time`.
    pub(crate) fn is_expired(&self, attempt: &ExamAttempt, now: PrimitiveDateTime) -> bool {
        now - attempt.end_time > self.grace
    }

    pub(crate) fn remaining_seconds(&self, attempt: &ExamAttempt, now: PrimitiveDateTime) -> i64 {
        (attempt.end_time - now).whole_seconds().max(0)
    }

    /// Attempts ending before this instant are expired at `now`.
    pub(crate) fn overdue_cutoff(&self, now: PrimitiveDateTime) -> PrimitiveDateTime {
        now - self.grace
    }

    pub(crate) async fn enforce(
        &self,
        pool: &PgPool,
        attempt: ExamAttempt,
        now: PrimitiveDateTime,
    ) -> ExamResult<Enforcement> {
        if attempt.submitted {
            return Ok(Enforcement::AlreadyClosed(attempt));
        }

        if !self.is_expired(&attempt, now) {
            let remaining_seconds = self.remaining_seconds(&attempt, now);
            return Ok(Enforcement::StillOpen { attempt, remaining_seconds });
        }

        let finalized =
            scoring::finalize(pool, &attempt.id, FinalizeMode::AutoDeadline, now).await?;
        if finalized.transitioned {
            Ok(Enforcement::ForciblyClosed(finalized.attempt))
        } else {
            Ok(Enforcement::AlreadyClosed(finalized.attempt))
        }
    }
}
