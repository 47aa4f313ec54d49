mod catalog;
mod session;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_exams))
        .route("/:exam_id", get(catalog::get_exam))
        .route("/:exam_id/attempts", post(session::start_attempt).get(session::list_my_attempts))
        .route("/:exam_id/attempts/current", get(session::current_attempt))
        .route("/:exam_id/submit", post(session::submit_attempt))
}
