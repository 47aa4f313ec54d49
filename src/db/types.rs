use serde::{Deserialize, Serialize};
use sqlx::Type;

/// How an attempt reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "finalizemode", rename_all = "snake_case")]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    AutoDeadline,
}

impl FinalizeMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::ManualSubmit => "manual_submit",
            Self::AutoDeadline => "auto_deadline",
        }
    }
}
