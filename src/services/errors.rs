use thiserror::Error;

/// Outcomes of exam operations that are reported back to the caller.
#[derive(Debug, Error)]
pub(crate) enum ExamError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Exam is not available at this time")]
    ExamNotAvailable,
    #[error("No attempts remaining ({used} of {max} used)")]
    AttemptLimitExceeded { used: i64, max: i32 },
    #[error("Attempt {0} is already submitted")]
    AttemptClosed(String),
    #[error("Attempt {0} is still in progress")]
    AttemptInProgress(String),
    #[error("{0}")]
    InvalidChoice(&'static str),
    /// Reported as `NotFound` outside the core.
    #[error("{resource} {id} belongs to another user")]
    OwnershipViolation { resource: &'static str, id: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub(crate) type ExamResult<T> = Result<T, ExamError>;
