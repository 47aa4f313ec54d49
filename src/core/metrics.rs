use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const ATTEMPTS_STARTED: &str = "exam_attempts_started_total";
pub(crate) const ATTEMPTS_REJECTED: &str = "exam_attempts_rejected_total";
pub(crate) const ATTEMPTS_FINALIZED: &str = "exam_attempts_finalized_total";
pub(crate) const ANSWERS_RECORDED: &str = "exam_answers_recorded_total";
pub(crate) const SUSPICIOUS_REQUESTS: &str = "exam_suspicious_requests_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(ATTEMPTS_STARTED, "Exam attempts created");
    metrics::describe_counter!(ATTEMPTS_REJECTED, "Attempt starts refused by the attempt limit");
    metrics::describe_counter!(ATTEMPTS_FINALIZED, "Attempts moved to the submitted state");
    metrics::describe_counter!(ANSWERS_RECORDED, "Answer upserts accepted");
    metrics::describe_counter!(
        SUSPICIOUS_REQUESTS,
        "Requests referencing choices or questions outside the attempt's exam"
    );
}
