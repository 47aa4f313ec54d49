mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", post(handlers::create_course))
        .route("/exams", post(handlers::create_exam))
        .route("/exams/:exam_id/questions", post(handlers::add_question))
        .route("/exams/:exam_id/attempts", get(handlers::list_exam_attempts))
        .route("/import", post(handlers::import_catalog))
}
