use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::tasks::expiry_sweep;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_interval =
        Duration::from_secs(state.settings().exam().expiry_sweep_interval_seconds);

    let handle = tokio::spawn(expiry_sweep_loop(state.clone(), sweep_interval, shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn expiry_sweep_loop(
    state: AppState,
    sweep_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(sweep_interval);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = expiry_sweep::close_overdue_attempts(&state).await {
                    tracing::error!(error = %err, "close_overdue_attempts failed");
                }
            }
        }
    }
}
