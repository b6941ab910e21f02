pub mod cv;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/cv/load", get(cv::handle_load))
        .route("/api/cv/save", post(cv::handle_save))
        .route("/api/user", get(cv::handle_current_user))
        .with_state(state)
}
