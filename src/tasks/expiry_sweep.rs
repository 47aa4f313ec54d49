use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::FinalizeMode;
use crate::repositories;
use crate::services::scoring;

const SWEEP_BATCH_SIZE: i64 = 500;

/// Finalizes open attempts that are past their deadline and grace period.
/// Returns how many attempts this sweep closed.
pub(crate) async fn close_overdue_attempts(state: &AppState) -> Result<usize> {
    let now = primitive_now_utc();
    let cutoff = state.expiry().overdue_cutoff(now);
    let mut closed = 0usize;

    loop {
        let overdue =
            repositories::attempts::list_overdue_open(state.db(), cutoff, SWEEP_BATCH_SIZE)
                .await
                .context("Failed to fetch overdue attempts")?;
        let batch_len = overdue.len();

        for attempt in overdue {
            let finalized =
                scoring::finalize(state.db(), &attempt.id, FinalizeMode::AutoDeadline, now)
                    .await
                    .with_context(|| format!("Failed to finalize attempt {}", attempt.id))?;
            if finalized.transitioned {
                closed += 1;
            }
        }

        if (batch_len as i64) < SWEEP_BATCH_SIZE {
            break;
        }
    }

    if closed > 0 {
        tracing::info!(closed_attempts = closed, "Closed overdue attempts");
    }
    metrics::counter!("expiry_sweep_closed_total").increment(closed as u64);

    Ok(closed)
}
