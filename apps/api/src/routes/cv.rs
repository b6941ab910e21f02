//! Axum route handlers for the CV load/save boundary.
//!
//! Every failure surfaces as 401 (no valid session) or 500 (anything else).

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::cv::validation::validate;
use crate::cv::CvDocument;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
}

/// GET /api/cv/load
///
/// Returns the stored CV, or a default seeded from the identity profile.
pub async fn handle_load(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CvDocument>, AppError> {
    let record = state.profiles.fetch(&user).await?;
    if record.cv.is_none() {
        info!("No stored CV for user {user}; returning seeded default");
    }
    Ok(Json(record.cv_or_seeded()))
}

/// POST /api/cv/save
///
/// Replaces the caller's CV with the request body.
pub async fn handle_save(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CvDocument>, JsonRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Json(cv) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let issues = validate(&cv);
    if !issues.is_empty() {
        warn!(
            "Saving CV for user {user} with {} constraint issue(s): {:?}",
            issues.len(),
            issues
        );
    }

    state.profiles.store_cv(&user, &cv).await?;
    info!("Saved CV for user {user}");

    Ok(Json(SaveResponse { success: true }))
}

/// GET /api/user
pub async fn handle_current_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.profiles.fetch(&user).await?.user))
}
