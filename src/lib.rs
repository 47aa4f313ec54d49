pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;

use crate::core::{config::Settings, state::AppState, telemetry, time::primitive_now_utc};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings, "api")?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let state = AppState::new(settings, db_pool);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        grace_seconds = state.expiry().grace().whole_seconds(),
        "Examina API listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(core::shutdown::shutdown_signal())
        .await?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings, "worker")?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let state = AppState::new(settings, db_pool);
    tracing::info!(
        interval_seconds = state.settings().exam().expiry_sweep_interval_seconds,
        "Examina worker started"
    );

    tasks::scheduler::run(state).await
}

pub async fn run_import(path: &Path) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings, "import")?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let summary = services::catalog_import::import_file(&db_pool, path, primitive_now_utc())
        .await
        .with_context(|| format!("import of {} failed", path.display()))?;

    tracing::info!(
        course_id = %summary.course_id,
        exam_id = %summary.exam_id,
        created_questions = summary.created_questions,
        skipped_questions = summary.skipped_questions,
        created_choices = summary.created_choices,
        "Catalog import finished"
    );

    db_pool.close().await;
    Ok(())
}
