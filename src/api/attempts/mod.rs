mod handlers;

use axum::{routing::get, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:attempt_id", get(handlers::get_attempt))
        .route("/:attempt_id/answers", put(handlers::record_answer))
        .route("/:attempt_id/results", get(handlers::get_results))
}

#[cfg(test)]
mod tests;
